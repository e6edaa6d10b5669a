use serde::{Deserialize, Serialize};

/// Monotonic ID generator shared across all arena-stored entity types.
/// Guarantees globally unique IDs: no group, polity, faction, cluster,
/// region, route, or language shares an ID with another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn starting_from(start: u64) -> Self {
        Self { next: start }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id that the next call to `next_id` will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Declare a typed arena key. Serializes as a bare integer.
macro_rules! entity_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
                ::serde::Serialize, ::serde::Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl $name {
                pub fn raw(self) -> u64 {
                    self.0
                }
            }

            impl ::std::fmt::Display for $name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    write!(f, "{}#{}", stringify!($name), self.0)
                }
            }
        )+
    };
}

entity_id!(GroupId, PolityId, FactionId, ClusterId, RegionId, RouteId, LanguageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids() {
        let mut id_gen = IdGenerator::new();
        assert_eq!(id_gen.next_id(), 1);
        assert_eq!(id_gen.next_id(), 2);
        assert_eq!(id_gen.next_id(), 3);
    }

    #[test]
    fn starting_from() {
        let mut id_gen = IdGenerator::starting_from(100);
        assert_eq!(id_gen.peek(), 100);
        assert_eq!(id_gen.next_id(), 100);
        assert_eq!(id_gen.next_id(), 101);
    }

    #[test]
    fn typed_ids_serialize_as_integers() {
        let json = serde_json::to_string(&GroupId(17)).unwrap();
        assert_eq!(json, "17");
        let back: PolityId = serde_json::from_str("9").unwrap();
        assert_eq!(back, PolityId(9));
        assert_eq!(GroupId(3).to_string(), "GroupId#3");
    }
}
