//! Converter registry keyed by `(value type, radix type)`.
//!
//! A [`Registry`] is built and configured up front, then either passed to a
//! [`crate::RadixSorter`] explicitly or installed once as the process-wide registry.
//! After installation it is only ever read.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::{Arc, OnceLock};

use bytemuck::Pod;
use log::debug;

use crate::converter::{PassThrough, RadixConverter, SignBitConverter, TwosComplementConverter};
use crate::number_system::NumberSystems;
use crate::{NumberSystem, RadixKey, Result, SortError};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// A converter looked up together with the number system of the keys it produces.
/// `converter` is `None` for pass-through registrations.
pub struct SignedConverter<K: RadixKey> {
    pub converter: Option<Arc<dyn RadixConverter<K>>>,
    pub number_system: NumberSystem,
}

struct Entry {
    // holds an `Arc<dyn RadixConverter<K>>`
    converter: Box<dyn Any + Send + Sync>,
    builtin: bool,
}

/// Number-system classifications and radix converters.
pub struct Registry {
    number_systems: NumberSystems,
    converters: HashMap<(TypeId, TypeId), Entry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry holding only the built-in classifications and converters.
    pub fn new() -> Self {
        let mut registry = Self { number_systems: NumberSystems::with_builtins(), converters: HashMap::new() };
        registry.put_builtin::<u8, u8>(NumberSystem::Unsigned);
        registry.put_builtin::<u16, u16>(NumberSystem::Unsigned);
        registry.put_builtin::<u32, u32>(NumberSystem::Unsigned);
        registry.put_builtin::<u64, u64>(NumberSystem::Unsigned);
        registry.put_builtin::<i8, u8>(NumberSystem::TwosComplement);
        registry.put_builtin::<i16, u16>(NumberSystem::TwosComplement);
        registry.put_builtin::<i32, u32>(NumberSystem::TwosComplement);
        registry.put_builtin::<i64, u64>(NumberSystem::TwosComplement);
        registry.put_builtin::<f32, u32>(NumberSystem::SignBit);
        registry.put_builtin::<f64, u64>(NumberSystem::SignBit);
        registry
    }

    /// Registry with nothing classified and no converters.
    pub fn empty() -> Self {
        Self { number_systems: NumberSystems::default(), converters: HashMap::new() }
    }

    // sizes of the built-in pairs match by construction
    fn put_builtin<V: 'static, K: RadixKey>(&mut self, number_system: NumberSystem) {
        let entry = Entry { converter: Box::new(builtin_converter::<K>(number_system)), builtin: true };
        self.converters.insert((TypeId::of::<V>(), TypeId::of::<K>()), entry);
    }

    /// The process-wide registry, created with the built-ins on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Makes this registry the process-wide one. Fails once the global registry exists,
    /// including when a sort already created the default one.
    pub fn install(self) -> Result<()> {
        GLOBAL.set(self).map_err(|_| SortError::RegistryInitialized)?;
        debug!("Installed custom global radix converter registry");
        Ok(())
    }

    pub fn number_system<T: 'static>(&self) -> Result<NumberSystem> {
        self.number_systems.get::<T>()
    }

    /// Classifies `T`. Re-asserting the same value is a no-op; changing it is an error.
    pub fn set_number_system<T: 'static>(&mut self, number_system: NumberSystem) -> Result<()> {
        self.number_systems.set::<T>(number_system)
    }

    /// Registers a user converter for `V -> K`. Built-in converters cannot be replaced.
    pub fn register<V, K, C>(&mut self, converter: C) -> Result<()>
    where
        V: Pod,
        K: RadixKey,
        C: RadixConverter<K> + 'static,
    {
        self.insert::<V, K>(Arc::new(converter), false)
    }

    /// Registers the built-in converter for `number_system` for `V -> K`.
    pub fn register_number_system<V: Pod, K: RadixKey>(&mut self, number_system: NumberSystem) -> Result<()> {
        self.insert::<V, K>(builtin_converter(number_system), true)
    }

    /// Registers the built-in converter matching the classification of `V`.
    pub fn register_classified<V: Pod, K: RadixKey>(&mut self) -> Result<()> {
        let number_system = self.number_system::<V>()?;
        self.register_number_system::<V, K>(number_system)
    }

    /// Sorts `V` on its raw bits read as `number_system`, with no conversion step.
    /// For `NumberSystem::SignBit` this routes floats through the sign split directly.
    pub fn register_pass_through<V: Pod, K: RadixKey>(&mut self, number_system: NumberSystem) -> Result<()> {
        self.insert::<V, K>(Arc::new(PassThrough::new(number_system)), true)
    }

    fn insert<V: Pod, K: RadixKey>(&mut self, converter: Arc<dyn RadixConverter<K>>, builtin: bool) -> Result<()> {
        if size_of::<V>() != size_of::<K>() {
            return Err(SortError::SizeMismatch {
                value_type: type_name::<V>(),
                value_size: size_of::<V>(),
                radix_type: type_name::<K>(),
                radix_size: size_of::<K>(),
            });
        }

        let key = (TypeId::of::<V>(), TypeId::of::<K>());
        if !builtin && self.converters.get(&key).is_some_and(|old| old.builtin) {
            return Err(SortError::BuiltinConverter { value_type: type_name::<V>(), radix_type: type_name::<K>() });
        }

        debug!(
            "Registered {} radix converter {} -> {} ({:?})",
            if builtin { "built-in" } else { "custom" },
            type_name::<V>(),
            type_name::<K>(),
            converter.number_system()
        );
        self.converters.insert(key, Entry { converter: Box::new(converter), builtin });
        Ok(())
    }

    pub fn get<V: 'static, K: RadixKey>(&self) -> Result<Arc<dyn RadixConverter<K>>> {
        self.converters
            .get(&(TypeId::of::<V>(), TypeId::of::<K>()))
            .and_then(|entry| entry.converter.downcast_ref::<Arc<dyn RadixConverter<K>>>())
            .cloned()
            .ok_or(SortError::MissingConverter { value_type: type_name::<V>(), radix_type: type_name::<K>() })
    }

    /// Like [`Registry::get`], but drops pass-through converters so the caller can treat the
    /// buffer as radix keys already.
    pub fn get_with_sign_support<V: 'static, K: RadixKey>(&self) -> Result<SignedConverter<K>> {
        let converter = self.get::<V, K>()?;
        let number_system = converter.number_system();
        let converter = (!converter.is_pass_through()).then_some(converter);
        Ok(SignedConverter { converter, number_system })
    }
}

fn builtin_converter<K: RadixKey>(number_system: NumberSystem) -> Arc<dyn RadixConverter<K>> {
    match number_system {
        NumberSystem::Unsigned => Arc::new(PassThrough::new(NumberSystem::Unsigned)),
        NumberSystem::OnesComplement | NumberSystem::TwosComplement => Arc::new(TwosComplementConverter),
        NumberSystem::SignBit => Arc::new(SignBitConverter),
    }
}

/// Converter for `V -> K` from the process-wide registry.
pub fn get_converter<V: 'static, K: RadixKey>() -> Result<Arc<dyn RadixConverter<K>>> {
    Registry::global().get::<V, K>()
}
