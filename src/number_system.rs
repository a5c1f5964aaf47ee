use std::any::{type_name, TypeId};
use std::collections::HashMap;

use crate::{Result, SortError};

/// How the raw bit pattern of a key relates to its semantic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberSystem {
    /// Bits are already ordered, e.g. `u32`.
    Unsigned,
    /// Negative values are the complement of their magnitude. Sorts the same as twos-complement.
    OnesComplement,
    /// e.g. `i32`.
    TwosComplement,
    /// Sign in the top bit, magnitude in the rest, e.g. `f32`.
    SignBit,
}

impl NumberSystem {
    /// True when the top bit of a key needs the sign split.
    #[inline]
    pub fn is_signed(self) -> bool {
        !matches!(self, NumberSystem::Unsigned)
    }
}

/// Per-type classification. Once a type is classified it can only be re-asserted with the same value.
#[derive(Debug, Default, Clone)]
pub(crate) struct NumberSystems {
    systems: HashMap<TypeId, NumberSystem>,
}

impl NumberSystems {
    pub(crate) fn with_builtins() -> Self {
        let mut table = Self::default();
        table.insert::<i8>(NumberSystem::TwosComplement);
        table.insert::<i16>(NumberSystem::TwosComplement);
        table.insert::<i32>(NumberSystem::TwosComplement);
        table.insert::<i64>(NumberSystem::TwosComplement);
        // answered by number_system lookups only, no converter is registered for them
        table.insert::<bool>(NumberSystem::Unsigned);
        table.insert::<char>(NumberSystem::Unsigned);
        table.insert::<u8>(NumberSystem::Unsigned);
        table.insert::<u16>(NumberSystem::Unsigned);
        table.insert::<u32>(NumberSystem::Unsigned);
        table.insert::<u64>(NumberSystem::Unsigned);
        table.insert::<f32>(NumberSystem::SignBit);
        table.insert::<f64>(NumberSystem::SignBit);
        table
    }

    fn insert<T: 'static>(&mut self, number_system: NumberSystem) {
        self.systems.insert(TypeId::of::<T>(), number_system);
    }

    pub(crate) fn get<T: 'static>(&self) -> Result<NumberSystem> {
        self.systems
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(SortError::UnknownNumberSystem { type_name: type_name::<T>() })
    }

    pub(crate) fn set<T: 'static>(&mut self, number_system: NumberSystem) -> Result<()> {
        match self.systems.get(&TypeId::of::<T>()) {
            None => {
                self.insert::<T>(number_system);
                Ok(())
            }
            Some(&existing) if existing == number_system => Ok(()),
            Some(&existing) => Err(SortError::NumberSystemConflict {
                type_name: type_name::<T>(),
                existing,
                requested: number_system,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Celsius;

    #[test]
    fn test_builtin_classification() {
        let table = NumberSystems::with_builtins();
        assert_eq!(table.get::<i16>().unwrap(), NumberSystem::TwosComplement);
        assert_eq!(table.get::<u64>().unwrap(), NumberSystem::Unsigned);
        assert_eq!(table.get::<char>().unwrap(), NumberSystem::Unsigned);
        assert_eq!(table.get::<bool>().unwrap(), NumberSystem::Unsigned);
        assert_eq!(table.get::<f64>().unwrap(), NumberSystem::SignBit);
    }

    #[test]
    fn test_unknown_type() {
        let table = NumberSystems::with_builtins();
        assert!(matches!(table.get::<Celsius>(), Err(SortError::UnknownNumberSystem { .. })));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut table = NumberSystems::with_builtins();
        table.set::<Celsius>(NumberSystem::SignBit).unwrap();
        table.set::<Celsius>(NumberSystem::SignBit).unwrap();
        assert_eq!(table.get::<Celsius>().unwrap(), NumberSystem::SignBit);
    }

    #[test]
    fn test_set_conflict() {
        let mut table = NumberSystems::with_builtins();
        let err = table.set::<i32>(NumberSystem::Unsigned).unwrap_err();
        assert!(matches!(
            err,
            SortError::NumberSystemConflict {
                existing: NumberSystem::TwosComplement,
                requested: NumberSystem::Unsigned,
                ..
            }
        ));
    }
}
