//! Protocol constants. All monetary values in minor units (1 QUILL = 10^8 units).

pub const COIN: u64 = 100_000_000;

/// Upper bound for any single amount or fee.
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

/// Version stamped on every authored transaction.
pub const TX_VERSION: u64 = 2;

/// Confirmations a coinbase credit needs before it may be spent.
pub const COINBASE_MATURITY: u64 = 100;

/// Maximum canonical (bincode) encoding size of a transaction in bytes.
pub const MAX_TX_SIZE: usize = 100_000;

/// Relay fee used for the dust check, in units per 1000 virtual bytes.
pub const DEFAULT_RELAY_FEE_PER_KVB: u64 = 1_000;

/// Fee rate applied when the caller supplies none, in units per 1000 virtual bytes.
pub const DEFAULT_FEE_PER_KVB: u64 = 1_000;

/// Highest derivation index per branch. Indices above it are reserved.
pub const MAX_ADDRESS_INDEX: u32 = (1 << 31) - 1;

/// Number of fee/size re-estimation rounds before authoring gives up.
pub const DEFAULT_MAX_FEE_ITERATIONS: usize = 8;
