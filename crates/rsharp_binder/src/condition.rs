//! Condition binding for `if`, `while`, `do`, `for` and `?:`.

use rsharp_ast::node::Expression;
use rsharp_core::text::TextSpan;
use rsharp_diagnostics::{messages, DiagnosticBag};

use crate::conversions::{ConversionClassifier, ConversionKind};
use crate::types::TypeId;

/// Check that a condition converts implicitly to `bool`.
///
/// A missing condition (`for (;;)`) is always valid. A condition whose type
/// is already an error reports nothing, so a bad expression yields one
/// diagnostic rather than a cascade. Otherwise CS0266 (an explicit
/// conversion exists, e.g. from `bool?`) or CS0029 is reported over the
/// whole condition with the condition type and `bool` as arguments.
///
/// Returns whether the condition is usable.
pub fn bind_condition<C>(
    condition: Option<&Expression<'_>>,
    condition_type: TypeId,
    classifier: &C,
    bag: &mut DiagnosticBag,
) -> bool
where
    C: ConversionClassifier + ?Sized,
{
    let Some(condition) = condition else {
        return true;
    };
    if condition.is_missing() || classifier.is_error_type(condition_type) {
        return false;
    }
    check_implicit_conversion(condition.span(), condition_type, classifier.boolean_type(), classifier, bag)
}

/// Report CS0029 or CS0266 at `span` when `source` has no implicit
/// conversion to `target`. Error types on either side report nothing.
pub fn check_implicit_conversion<C>(
    span: TextSpan,
    source: TypeId,
    target: TypeId,
    classifier: &C,
    bag: &mut DiagnosticBag,
) -> bool
where
    C: ConversionClassifier + ?Sized,
{
    if classifier.is_error_type(source) || classifier.is_error_type(target) {
        return true;
    }
    let message = match classifier.classify_conversion(source, target) {
        ConversionKind::Identity | ConversionKind::ImplicitStandard | ConversionKind::ImplicitUserDefined => {
            return true;
        }
        ConversionKind::ExplicitOnly => &messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS,
        ConversionKind::None => &messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1,
    };
    let source_name = classifier.display_type(source);
    let target_name = classifier.display_type(target);
    bag.report(message, span, &[&source_name, &target_name]);
    false
}
