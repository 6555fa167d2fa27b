// crates/rowbind-core/src/plugin/mod.rs
// ============================================================================
// Module: Rowbind Interception Pipeline
// Description: Declarative interception of the four extension points.
// Purpose: Let external code wrap extension points without engine changes.
// Dependencies: crate::interfaces, tracing
// ============================================================================

//! ## Overview
//! Interceptors declare which `extension point + method + argument types`
//! they observe. A [`Plugin`] validates those declarations against the static
//! method table once at registration, then wraps extension-point trait
//! objects with forwarding proxies. Wrapping happens once per extension-point
//! instance, never per call.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod invocation;
mod proxy;
mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use invocation::Arguments;
pub use invocation::Interceptor;
pub use invocation::Invocation;
pub use invocation::Outcome;
pub use proxy::InterceptorChain;
pub use proxy::Pluggable;
pub use proxy::Plugin;
pub use signature::ExtensionPoint;
pub use signature::Method;
pub use signature::MethodSignature;
pub use signature::PluginError;
pub use signature::Signature;

#[cfg(test)]
mod tests;
