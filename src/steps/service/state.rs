// ABOUTME: Service deployment state marker types for the type state pattern.
// ABOUTME: Later states carry the service address once it is known.

/// Nothing deployed yet in this run.
/// Available actions: `deploy()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Service deployed; address not yet recorded.
/// Available actions: `fetch_address()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Created;

/// Address recorded; environment not yet patched with it.
/// Available actions: `configure()`
#[derive(Debug, Clone)]
pub struct AddressKnown {
    pub(crate) url: String,
}

/// Service patched with its own address.
#[derive(Debug, Clone)]
pub struct Configured {
    pub(crate) url: String,
}
