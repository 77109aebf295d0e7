// ABOUTME: Persistent key/value state shared between provisioning steps.
// ABOUTME: Flat KEY='value' file on disk with a typed record view on top.

mod codec;
mod error;
mod key;
mod record;
mod store;

pub use codec::{encode_entry, is_valid_key, parse_entries, quote};
pub use error::StateError;
pub use key::StateKey;
pub use record::{DeployStage, ParseDeployStageError, StateRecord};
pub use store::{DEFAULT_STATE_FILE, StateStore};
