use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by card and line ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic suffix shared by every generated id.
static COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a fresh id that has never been handed out before.
            pub fn generate() -> Self {
                loop {
                    let candidate = format!(concat!($prefix, "_{}"), next_suffix());
                    // Ids restored from files may already occupy a generated name.
                    if INTERNER.get(&candidate).is_none() {
                        return Self::intern(&candidate);
                    }
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a card. 4 bytes, `Copy`, O(1) `Eq`/`Hash`.
    CardId,
    "card"
);

interned_id!(
    /// Identifier of a line between two cards.
    LineId,
    "line"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = CardId::intern("card_alpha");
        let b = CardId::intern("card_alpha");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "card_alpha");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = CardId::generate();
        let b = CardId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("card_"));
        assert!(LineId::generate().as_str().starts_with("line_"));
    }

    #[test]
    fn generate_skips_names_already_interned() {
        let n = COUNTER.load(Ordering::Relaxed);
        let taken = format!("card_{n}");
        let _ = CardId::intern(&taken);
        let fresh = CardId::generate();
        assert_ne!(fresh.as_str(), taken);
    }
}
