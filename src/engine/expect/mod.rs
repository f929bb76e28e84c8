pub mod invoker;
pub mod navigator;
pub mod predicate;
pub mod resolver;

pub use invoker::{ExpectArgs, invoke};
pub use predicate::{TerminalPredicate, TypeMatch, ValueMatch};
pub use resolver::{FailurePolicy, Resolver, resolve};
