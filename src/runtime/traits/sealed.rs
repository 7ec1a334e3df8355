// ABOUTME: Sealed trait pattern for the runtime capability traits.
// ABOUTME: Only the local and remote runtimes (and test doubles) may implement them.

/// Supertrait of every runtime capability trait.
///
/// Keeping it crate-private lets the capability traits grow new methods
/// without breaking downstream code, since nothing outside the crate can
/// implement them.
pub trait Sealed {}
