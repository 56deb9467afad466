//! Conversion classification.
//!
//! The condition and assignment checks only need to know which kind of
//! conversion exists between two types, so they go through the
//! `ConversionClassifier` trait. `TypeTable` is the implementation used by
//! the binder; tests substitute their own.

use crate::types::{SpecialType, TypeId, TypeKind, TypeTable, WellKnownGeneric};

/// The strongest conversion that exists from one type to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Identity,
    ImplicitStandard,
    ImplicitUserDefined,
    /// Only a cast can perform it.
    ExplicitOnly,
    None,
}

impl ConversionKind {
    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            ConversionKind::Identity | ConversionKind::ImplicitStandard | ConversionKind::ImplicitUserDefined
        )
    }

    pub fn exists(self) -> bool {
        self != ConversionKind::None
    }
}

/// An `implicit operator` or `explicit operator` declared in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDefinedConversion {
    pub source: TypeId,
    pub target: TypeId,
    pub is_implicit: bool,
}

pub trait ConversionClassifier {
    fn classify_conversion(&self, source: TypeId, target: TypeId) -> ConversionKind;

    /// The type name used in diagnostic arguments.
    fn display_type(&self, ty: TypeId) -> String;

    fn boolean_type(&self) -> TypeId;

    /// Whether `ty` is the type of an expression that already failed to bind.
    fn is_error_type(&self, ty: TypeId) -> bool;
}

impl ConversionClassifier for TypeTable {
    fn classify_conversion(&self, source: TypeId, target: TypeId) -> ConversionKind {
        if source == target {
            return ConversionKind::Identity;
        }
        let standard = self.classify_standard(source, target);
        if standard.is_implicit() {
            return standard;
        }
        match self.classify_user_defined(source, target) {
            ConversionKind::ImplicitUserDefined => ConversionKind::ImplicitUserDefined,
            ConversionKind::ExplicitOnly => ConversionKind::ExplicitOnly,
            _ => standard,
        }
    }

    fn display_type(&self, ty: TypeId) -> String {
        self.display(ty)
    }

    fn boolean_type(&self) -> TypeId {
        self.bool_type
    }

    fn is_error_type(&self, ty: TypeId) -> bool {
        self.is_error(ty)
    }
}

impl TypeTable {
    /// Built-in conversions: identity, numeric, nullable, null literal,
    /// boxing and reference conversions.
    pub fn classify_standard(&self, source: TypeId, target: TypeId) -> ConversionKind {
        if source == target {
            return ConversionKind::Identity;
        }
        match (self.kind(source), self.kind(target)) {
            (TypeKind::Error, _) | (_, TypeKind::Error) => ConversionKind::Identity,
            (_, TypeKind::Special(SpecialType::Void)) | (TypeKind::Special(SpecialType::Void), _) => {
                ConversionKind::None
            }
            (TypeKind::Null, _) => {
                if self.is_reference_type(target) || self.nullable_underlying(target).is_some() {
                    ConversionKind::ImplicitStandard
                } else {
                    ConversionKind::None
                }
            }
            (_, TypeKind::Null) => ConversionKind::None,
            (_, TypeKind::Special(SpecialType::Object)) => ConversionKind::ImplicitStandard,
            (TypeKind::Special(SpecialType::Object), _) => ConversionKind::ExplicitOnly,
            (TypeKind::Special(s), TypeKind::Special(t)) => classify_special(*s, *t),
            (TypeKind::Nullable(s), TypeKind::Nullable(t)) => lift(self.classify_standard(*s, *t)),
            (_, TypeKind::Nullable(t)) => lift(self.classify_standard(source, *t)),
            (TypeKind::Nullable(s), _) => {
                if self.classify_standard(*s, target).exists() {
                    ConversionKind::ExplicitOnly
                } else {
                    ConversionKind::None
                }
            }
            (
                TypeKind::Array { element: s, rank: source_rank },
                TypeKind::Array { element: t, rank: target_rank },
            ) => {
                if source_rank != target_rank || !self.is_reference_type(*s) || !self.is_reference_type(*t) {
                    return ConversionKind::None;
                }
                match self.classify_standard(*s, *t) {
                    ConversionKind::Identity | ConversionKind::ImplicitStandard => ConversionKind::ImplicitStandard,
                    ConversionKind::ExplicitOnly => ConversionKind::ExplicitOnly,
                    _ => ConversionKind::None,
                }
            }
            (_, TypeKind::Generic { definition: WellKnownGeneric::IEnumerable, arguments }) => {
                let Some(&target_element) = arguments.first() else {
                    return ConversionKind::None;
                };
                match self.element_type(source) {
                    Some(element) if self.is_enumerable_element_compatible(element, target_element) => {
                        ConversionKind::ImplicitStandard
                    }
                    _ => self.classify_from_interface(source),
                }
            }
            (TypeKind::Generic { definition, .. }, _) if definition.is_interface() => {
                self.classify_from_interface(target)
            }
            _ => ConversionKind::None,
        }
    }

    fn is_enumerable_element_compatible(&self, element: TypeId, target_element: TypeId) -> bool {
        element == target_element
            || (self.is_reference_type(element)
                && self.is_reference_type(target_element)
                && self.classify_standard(element, target_element).is_implicit())
    }

    /// A conversion between an interface and a class type exists explicitly
    /// unless the class is a struct, in which case it does not exist at all.
    fn classify_from_interface(&self, other: TypeId) -> ConversionKind {
        match self.kind(other) {
            TypeKind::Array { .. } | TypeKind::Generic { .. } => ConversionKind::ExplicitOnly,
            TypeKind::Named { is_struct: false, .. } => ConversionKind::ExplicitOnly,
            _ => ConversionKind::None,
        }
    }

    /// Conversions through a declared operator. An operator applies when the
    /// source converts to its parameter and its result converts to the target
    /// by standard implicit conversions.
    fn classify_user_defined(&self, source: TypeId, target: TypeId) -> ConversionKind {
        let mut best = ConversionKind::None;
        for conversion in &self.user_conversions {
            let into = self.classify_standard(source, conversion.source);
            let out = self.classify_standard(conversion.target, target);
            if !into.exists() || !out.exists() {
                continue;
            }
            if conversion.is_implicit && into.is_implicit() && out.is_implicit() {
                return ConversionKind::ImplicitUserDefined;
            }
            best = ConversionKind::ExplicitOnly;
        }
        best
    }
}

fn lift(underlying: ConversionKind) -> ConversionKind {
    match underlying {
        ConversionKind::Identity | ConversionKind::ImplicitStandard => ConversionKind::ImplicitStandard,
        ConversionKind::ExplicitOnly => ConversionKind::ExplicitOnly,
        _ => ConversionKind::None,
    }
}

fn classify_special(source: SpecialType, target: SpecialType) -> ConversionKind {
    if source == target {
        return ConversionKind::Identity;
    }
    let numeric_like = |s: SpecialType| s.is_numeric() || s == SpecialType::Char;
    if !numeric_like(source) || !numeric_like(target) {
        return ConversionKind::None;
    }
    if is_implicit_numeric(source, target) {
        ConversionKind::ImplicitStandard
    } else {
        ConversionKind::ExplicitOnly
    }
}

/// The implicit numeric conversion table.
fn is_implicit_numeric(source: SpecialType, target: SpecialType) -> bool {
    use SpecialType::*;
    match source {
        SByte => matches!(target, Short | Int | Long | Float | Double | Decimal),
        Byte => matches!(target, Short | UShort | Int | UInt | Long | ULong | Float | Double | Decimal),
        Short => matches!(target, Int | Long | Float | Double | Decimal),
        UShort | Char => matches!(target, Int | UInt | Long | ULong | Float | Double | Decimal)
            || (source == Char && target == UShort),
        Int => matches!(target, Long | Float | Double | Decimal),
        UInt => matches!(target, Long | ULong | Float | Double | Decimal),
        Long | ULong => matches!(target, Float | Double | Decimal),
        Float => target == Double,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        let table = TypeTable::new();
        let byte = table.special(SpecialType::Byte);
        assert_eq!(table.classify_conversion(table.int_type, table.long_type), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(table.long_type, table.int_type), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(table.char_type, table.int_type), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(table.int_type, table.char_type), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(byte, table.double_type), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(table.double_type, byte), ConversionKind::ExplicitOnly);
    }

    #[test]
    fn test_bool_converts_to_nothing_numeric() {
        let table = TypeTable::new();
        assert_eq!(table.classify_conversion(table.int_type, table.bool_type), ConversionKind::None);
        assert_eq!(table.classify_conversion(table.bool_type, table.int_type), ConversionKind::None);
        assert_eq!(table.classify_conversion(table.string_type, table.bool_type), ConversionKind::None);
    }

    #[test]
    fn test_nullable_conversions() {
        let mut table = TypeTable::new();
        let bool_nullable = table.nullable(table.bool_type);
        let int_nullable = table.nullable(table.int_type);
        let long_nullable = table.nullable(table.long_type);
        assert_eq!(table.classify_conversion(table.bool_type, bool_nullable), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(bool_nullable, table.bool_type), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(int_nullable, long_nullable), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(int_nullable, table.bool_type), ConversionKind::None);
        assert_eq!(table.classify_conversion(table.null_type, int_nullable), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(table.null_type, table.int_type), ConversionKind::None);
        assert_eq!(table.classify_conversion(table.null_type, table.string_type), ConversionKind::ImplicitStandard);
    }

    #[test]
    fn test_enumerable_conversions() {
        let mut table = TypeTable::new();
        let strings = table.enumerable_of(table.string_type);
        let string_array = table.array(table.string_type, 1);
        let objects = table.enumerable_of(table.object_type);
        assert_eq!(table.classify_conversion(string_array, strings), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(strings, objects), ConversionKind::ImplicitStandard);
        assert_eq!(table.classify_conversion(strings, string_array), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(strings, table.bool_type), ConversionKind::None);
        assert_eq!(table.classify_conversion(strings, table.object_type), ConversionKind::ImplicitStandard);
    }

    #[test]
    fn test_user_defined_conversions() {
        let mut table = TypeTable::new();
        let matrix = table.named("Matrix", false);
        let cell = table.named("Cell", true);
        table.add_user_conversion(UserDefinedConversion {
            source: matrix,
            target: table.bool_type,
            is_implicit: true,
        });
        table.add_user_conversion(UserDefinedConversion {
            source: cell,
            target: table.int_type,
            is_implicit: false,
        });
        assert_eq!(table.classify_conversion(matrix, table.bool_type), ConversionKind::ImplicitUserDefined);
        assert_eq!(table.classify_conversion(cell, table.int_type), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(cell, table.long_type), ConversionKind::ExplicitOnly);
        assert_eq!(table.classify_conversion(cell, table.bool_type), ConversionKind::None);
    }

    #[test]
    fn test_error_type_converts_silently() {
        let table = TypeTable::new();
        assert!(table.classify_conversion(table.error_type, table.bool_type).is_implicit());
        assert!(table.classify_conversion(table.int_type, table.error_type).is_implicit());
    }
}
