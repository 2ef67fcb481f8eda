//! The built-in class universe.
//!
//! Every function returns the same [`ClassRef`] on each call; classes are
//! created lazily on first use.

use std::sync::LazyLock;

use crate::{ClassInfo, ClassRef, DataType, FieldInfo};

macro_rules! builtin_class {
    ($(#[$meta:meta])* $name:ident => $init:expr) => {
        $(#[$meta])*
        pub fn $name() -> ClassRef {
            static CLASS: LazyLock<ClassRef> = LazyLock::new(|| $init);
            *CLASS
        }
    };
}

// -----------------------------------------------------------------------------
// Scalars

builtin_class!(
    /// The root of the class hierarchy. Every class is a subclass of `Object`.
    object => ClassInfo::builder("Object").opaque()
);

builtin_class!(string => ClassInfo::builder("String").opaque());

builtin_class!(
    /// Common supertype of the boxed numbers and the big numbers.
    number => ClassInfo::builder("Number").opaque()
);

builtin_class!(boolean => ClassInfo::builder("Boolean").opaque());

builtin_class!(character => ClassInfo::builder("Character").opaque());

builtin_class!(byte => boxed_number("Byte"));
builtin_class!(short => boxed_number("Short"));
builtin_class!(integer => boxed_number("Integer"));
builtin_class!(long => boxed_number("Long"));
builtin_class!(float => boxed_number("Float"));
builtin_class!(double => boxed_number("Double"));

builtin_class!(big_integer => boxed_number("BigInteger"));

builtin_class!(
    /// Arbitrary precision decimal, carried as its JSON numeral.
    big_decimal => boxed_number("BigDecimal")
);

fn boxed_number(name: &str) -> ClassRef {
    ClassInfo::builder(name)
        .extends(DataType::class(number()))
        .opaque()
}

// -----------------------------------------------------------------------------
// Collections

builtin_class!(
    /// `List<E>`, an ordered collection.
    list => ClassInfo::builder("List").param("E").opaque()
);

builtin_class!(
    /// `ArrayList<E> extends List<E>`.
    array_list => ClassInfo::builder("ArrayList")
        .param("E")
        .extends(DataType::known(list(), [DataType::var("E")]))
        .opaque()
);

builtin_class!(
    /// `Set<E>`, a collection without duplicates.
    set => ClassInfo::builder("Set").param("E").opaque()
);

builtin_class!(
    /// `Map<K, V>`, key/value pairs in insertion order.
    map => ClassInfo::builder("Map").param("K").param("V").opaque()
);

builtin_class!(
    /// `Entry<K, V>`, a record of `key` and `value`.
    entry => ClassInfo::builder("Entry")
        .param("K")
        .param("V")
        .record([
            FieldInfo::new("key", DataType::var("K")),
            FieldInfo::new("value", DataType::var("V")),
        ])
);

// -----------------------------------------------------------------------------
// Wrappers

builtin_class!(
    /// `Optional<T>`, a value that may be empty.
    ///
    /// A record field of this type becomes an optional member.
    optional => ClassInfo::builder("Optional").param("T").opaque()
);

builtin_class!(
    /// `Phantom<T>`, a field that is never serialized and always empty.
    phantom => ClassInfo::builder("Phantom").param("T").opaque()
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_singletons() {
        assert_eq!(list(), list());
        assert_ne!(list(), set());
        assert_eq!(array_list().supers()[0].class_ref(), Some(list()));
    }

    #[test]
    fn numbers_share_a_supertype() {
        let numbers = [byte(), short(), integer(), long(), float(), double()];
        for class in numbers.into_iter().chain([big_integer(), big_decimal()]) {
            assert!(class.is_subclass_of(number()), "{class}");
        }
        assert!(!string().is_subclass_of(number()));
    }

    #[test]
    fn entry_is_a_generic_record() {
        let entry = entry();
        assert!(entry.is_record());
        assert_eq!(entry.fields()[1].ty(), &DataType::var("V"));
    }
}
