//! Type representation.
//!
//! Types are stored in a TypeTable (type arena) and referenced by TypeId.
//! Construction is hash-consed: asking for `int?` twice yields the same id,
//! so type identity is id equality.

use indexmap::IndexMap;
use rsharp_ast::syntax_kind::SyntaxKind;
use rustc_hash::FxHashMap;

use crate::conversions::UserDefinedConversion;

/// Index of a type in a `TypeTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The predefined types spelled with a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialType {
    Bool,
    Char,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    String,
    Object,
    Void,
}

impl SpecialType {
    pub const ALL: [SpecialType; 16] = [
        SpecialType::Bool,
        SpecialType::Char,
        SpecialType::SByte,
        SpecialType::Byte,
        SpecialType::Short,
        SpecialType::UShort,
        SpecialType::Int,
        SpecialType::UInt,
        SpecialType::Long,
        SpecialType::ULong,
        SpecialType::Float,
        SpecialType::Double,
        SpecialType::Decimal,
        SpecialType::String,
        SpecialType::Object,
        SpecialType::Void,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            SpecialType::Bool => "bool",
            SpecialType::Char => "char",
            SpecialType::SByte => "sbyte",
            SpecialType::Byte => "byte",
            SpecialType::Short => "short",
            SpecialType::UShort => "ushort",
            SpecialType::Int => "int",
            SpecialType::UInt => "uint",
            SpecialType::Long => "long",
            SpecialType::ULong => "ulong",
            SpecialType::Float => "float",
            SpecialType::Double => "double",
            SpecialType::Decimal => "decimal",
            SpecialType::String => "string",
            SpecialType::Object => "object",
            SpecialType::Void => "void",
        }
    }

    pub fn from_keyword(kind: SyntaxKind) -> Option<SpecialType> {
        let special = match kind {
            SyntaxKind::BoolKeyword => SpecialType::Bool,
            SyntaxKind::CharKeyword => SpecialType::Char,
            SyntaxKind::SByteKeyword => SpecialType::SByte,
            SyntaxKind::ByteKeyword => SpecialType::Byte,
            SyntaxKind::ShortKeyword => SpecialType::Short,
            SyntaxKind::UShortKeyword => SpecialType::UShort,
            SyntaxKind::IntKeyword => SpecialType::Int,
            SyntaxKind::UIntKeyword => SpecialType::UInt,
            SyntaxKind::LongKeyword => SpecialType::Long,
            SyntaxKind::ULongKeyword => SpecialType::ULong,
            SyntaxKind::FloatKeyword => SpecialType::Float,
            SyntaxKind::DoubleKeyword => SpecialType::Double,
            SyntaxKind::DecimalKeyword => SpecialType::Decimal,
            SyntaxKind::StringKeyword => SpecialType::String,
            SyntaxKind::ObjectKeyword => SpecialType::Object,
            SyntaxKind::VoidKeyword => SpecialType::Void,
            _ => return None,
        };
        Some(special)
    }

    /// Integral and floating-point types. `char` is not numeric here even
    /// though it converts to most of them.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SpecialType::SByte
                | SpecialType::Byte
                | SpecialType::Short
                | SpecialType::UShort
                | SpecialType::Int
                | SpecialType::UInt
                | SpecialType::Long
                | SpecialType::ULong
                | SpecialType::Float
                | SpecialType::Double
                | SpecialType::Decimal
        )
    }

    pub fn is_integral(self) -> bool {
        self.is_numeric()
            && !matches!(self, SpecialType::Float | SpecialType::Double | SpecialType::Decimal)
    }

    pub fn is_value_type(self) -> bool {
        !matches!(self, SpecialType::String | SpecialType::Object | SpecialType::Void)
    }
}

/// Generic library types the binder knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownGeneric {
    IEnumerable,
    List,
    IGrouping,
}

impl WellKnownGeneric {
    pub fn full_name(self) -> &'static str {
        match self {
            WellKnownGeneric::IEnumerable => "System.Collections.Generic.IEnumerable",
            WellKnownGeneric::List => "System.Collections.Generic.List",
            WellKnownGeneric::IGrouping => "System.Linq.IGrouping",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            WellKnownGeneric::IGrouping => 2,
            _ => 1,
        }
    }

    pub fn is_interface(self) -> bool {
        !matches!(self, WellKnownGeneric::List)
    }

    /// Resolve a simple or namespace-qualified name with `arity` type arguments.
    pub fn from_name(name: &str, arity: usize) -> Option<WellKnownGeneric> {
        let simple = name.rsplit('.').next().unwrap_or(name);
        let generic = match simple {
            "IEnumerable" => WellKnownGeneric::IEnumerable,
            "List" => WellKnownGeneric::List,
            "IGrouping" => WellKnownGeneric::IGrouping,
            _ => return None,
        };
        (generic.arity() == arity).then_some(generic)
    }
}

/// The specific data for each type kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Produced for anything that failed to bind. Converts to and from every type.
    Error,
    /// The type of the `null` literal.
    Null,
    Special(SpecialType),
    /// `T?` over a value type.
    Nullable(TypeId),
    Array { element: TypeId, rank: u32 },
    Generic { definition: WellKnownGeneric, arguments: Vec<TypeId> },
    /// A class or struct declared in source.
    Named { name: String, is_struct: bool },
}

/// Fields and methods of a source-declared type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MemberTable {
    pub fields: IndexMap<String, TypeId>,
    /// Method name to return type. Overloads keep the first declaration.
    pub methods: IndexMap<String, TypeId>,
}

/// The type arena - stores all types.
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<TypeKind>,
    interned: FxHashMap<TypeKind, TypeId>,
    members: FxHashMap<TypeId, MemberTable>,
    pub(crate) user_conversions: Vec<UserDefinedConversion>,

    // Well-known type IDs
    pub error_type: TypeId,
    pub null_type: TypeId,
    pub bool_type: TypeId,
    pub char_type: TypeId,
    pub int_type: TypeId,
    pub long_type: TypeId,
    pub double_type: TypeId,
    pub string_type: TypeId,
    pub object_type: TypeId,
    pub void_type: TypeId,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = TypeTable {
            types: Vec::new(),
            interned: FxHashMap::default(),
            members: FxHashMap::default(),
            user_conversions: Vec::new(),
            error_type: TypeId(0),
            null_type: TypeId(0),
            bool_type: TypeId(0),
            char_type: TypeId(0),
            int_type: TypeId(0),
            long_type: TypeId(0),
            double_type: TypeId(0),
            string_type: TypeId(0),
            object_type: TypeId(0),
            void_type: TypeId(0),
        };

        table.error_type = table.intern(TypeKind::Error);
        table.null_type = table.intern(TypeKind::Null);
        for special in SpecialType::ALL {
            table.intern(TypeKind::Special(special));
        }
        table.bool_type = table.special(SpecialType::Bool);
        table.char_type = table.special(SpecialType::Char);
        table.int_type = table.special(SpecialType::Int);
        table.long_type = table.special(SpecialType::Long);
        table.double_type = table.special(SpecialType::Double);
        table.string_type = table.special(SpecialType::String);
        table.object_type = table.special(SpecialType::Object);
        table.void_type = table.special(SpecialType::Void);
        table
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    /// Predefined types are created in `SpecialType::ALL` order right after
    /// the error and null types.
    pub fn special(&self, special: SpecialType) -> TypeId {
        TypeId(2 + special as u32)
    }

    /// `T?`. Only value types get a nullable wrapper; `string?` stays `string`.
    pub fn nullable(&mut self, underlying: TypeId) -> TypeId {
        if self.is_error(underlying)
            || self.nullable_underlying(underlying).is_some()
            || !self.is_value_type(underlying)
        {
            return underlying;
        }
        self.intern(TypeKind::Nullable(underlying))
    }

    pub fn array(&mut self, element: TypeId, rank: u32) -> TypeId {
        if self.is_error(element) {
            return element;
        }
        self.intern(TypeKind::Array { element, rank: rank.max(1) })
    }

    pub fn generic(&mut self, definition: WellKnownGeneric, arguments: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Generic { definition, arguments })
    }

    pub fn enumerable_of(&mut self, element: TypeId) -> TypeId {
        self.generic(WellKnownGeneric::IEnumerable, vec![element])
    }

    /// A source-declared class or struct, by its qualified name.
    pub fn named(&mut self, name: &str, is_struct: bool) -> TypeId {
        self.intern(TypeKind::Named { name: name.to_string(), is_struct })
    }

    #[inline]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.types.get(id.index()).unwrap_or(&TypeKind::Error)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Error)
    }

    pub fn special_of(&self, id: TypeId) -> Option<SpecialType> {
        match self.kind(id) {
            TypeKind::Special(special) => Some(*special),
            _ => None,
        }
    }

    pub fn nullable_underlying(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Nullable(underlying) => Some(*underlying),
            _ => None,
        }
    }

    pub fn is_value_type(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Special(special) => special.is_value_type(),
            TypeKind::Nullable(_) => true,
            TypeKind::Named { is_struct, .. } => *is_struct,
            _ => false,
        }
    }

    /// Types that `null` converts to without becoming nullable.
    pub fn is_reference_type(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Special(SpecialType::String | SpecialType::Object) => true,
            TypeKind::Array { .. } | TypeKind::Generic { .. } => true,
            TypeKind::Named { is_struct, .. } => !*is_struct,
            _ => false,
        }
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.special_of(id).is_some_and(SpecialType::is_numeric)
    }

    /// The element type a query or `foreach` sees when enumerating `id`.
    pub fn element_type(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Array { element, .. } => Some(*element),
            TypeKind::Special(SpecialType::String) => Some(self.char_type),
            TypeKind::Generic { definition, arguments } => match definition {
                WellKnownGeneric::IEnumerable | WellKnownGeneric::List => arguments.first().copied(),
                WellKnownGeneric::IGrouping => arguments.get(1).copied(),
            },
            _ => None,
        }
    }

    // ========================================================================
    // Members of source types
    // ========================================================================

    pub fn add_field(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        self.members.entry(owner).or_default().fields.entry(name.to_string()).or_insert(ty);
    }

    pub fn add_method(&mut self, owner: TypeId, name: &str, return_type: TypeId) {
        self.members
            .entry(owner)
            .or_default()
            .methods
            .entry(name.to_string())
            .or_insert(return_type);
    }

    pub fn members(&self, owner: TypeId) -> Option<&MemberTable> {
        self.members.get(&owner)
    }

    pub fn field(&self, owner: TypeId, name: &str) -> Option<TypeId> {
        self.members.get(&owner)?.fields.get(name).copied()
    }

    pub fn method(&self, owner: TypeId, name: &str) -> Option<TypeId> {
        self.members.get(&owner)?.methods.get(name).copied()
    }

    pub fn add_user_conversion(&mut self, conversion: UserDefinedConversion) {
        self.user_conversions.push(conversion);
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// The name diagnostics print for a type: keywords for predefined types,
    /// namespace-qualified names for library generics.
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(id, &mut out);
        out
    }

    fn write_type(&self, id: TypeId, out: &mut String) {
        match self.kind(id) {
            TypeKind::Error => out.push('?'),
            TypeKind::Null => out.push_str("<null>"),
            TypeKind::Special(special) => out.push_str(special.keyword()),
            TypeKind::Nullable(underlying) => {
                self.write_type(*underlying, out);
                out.push('?');
            }
            TypeKind::Array { element, rank } => {
                self.write_type(*element, out);
                out.push('[');
                for _ in 1..*rank {
                    out.push(',');
                }
                out.push(']');
            }
            TypeKind::Generic { definition, arguments } => {
                out.push_str(definition.full_name());
                out.push('<');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(*argument, out);
                }
                out.push('>');
            }
            TypeKind::Named { name, .. } => out.push_str(name),
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
