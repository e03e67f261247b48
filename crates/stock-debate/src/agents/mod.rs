//! Debating personas and the symbol lookup agent

pub mod persona;
pub mod symbol;

pub use persona::{Persona, PersonaId};
pub use symbol::SymbolResolver;
