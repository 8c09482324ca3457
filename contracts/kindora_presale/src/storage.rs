use soroban_sdk::{contracttype, Address};

// Constants
pub const SCALE: i128 = 10_000_000; // 7 decimals
pub const BASIS_POINTS: u32 = 10_000;
pub const MAX_SLIPPAGE_BPS: u32 = 3_000;

#[contracttype]
#[derive(Clone, Debug)]
pub struct SaleConfig {
    /// Unix timestamp when contributions open (0 = window not configured)
    pub start_time: u64,
    /// Unix timestamp when contributions close
    pub end_time: u64,
    /// Minimum raise for the sale to settle on the success path
    pub soft_cap: i128,
    /// Maximum raise in payment units (0 = unbounded)
    pub hard_cap: i128,
    /// Minimum payment units per contribution
    pub min_contribution: i128,
    /// Maximum payment units per participant across the sale (0 = unbounded)
    pub max_contribution: i128,
    /// Share of the raise committed to liquidity at finalize
    pub lp_percent: u32,
    /// Share of the raise credited to marketing at finalize
    pub marketing_percent: u32,
    /// Slippage bound applied to both liquidity legs, in basis points
    pub max_slippage_bps: u32,
    /// Tokens per payment unit (SCALE-scaled) used to size the liquidity deposit
    pub listing_rate: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct Stage {
    /// Tokens sellable at this tier
    pub token_allocation: i128,
    /// Tokens per payment unit (SCALE-scaled)
    pub rate: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct Participant {
    /// Net payment units paid in (change never leaves the participant)
    pub contributed: i128,
    /// Tokens reserved for this participant, not yet transferred
    pub entitled: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct SaleTotals {
    /// Running sum of payment units collected
    pub total_raised: i128,
    /// Running sum of tokens reserved across all participants
    pub tokens_sold: i128,
    /// Cumulative tokens already transferred to claimants
    pub tokens_claimed: i128,
    /// Cached sum of stage allocations (sale-wide token cap)
    pub sale_allocation: i128,
    /// Index of the active pricing stage
    pub current_stage: u32,
    /// Tokens sold inside the active stage
    pub stage_sold: i128,
    /// Payment units held for pull-withdrawal by the marketing recipient
    pub marketing_pending: i128,
    /// Terminal latch, set exactly once by finalize
    pub finalized: bool,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Owner,
    MarketingRecipient,
    PaymentToken,
    SaleToken,
    Pool,
    Config,
    Stages,
    Participant(Address),
    Totals,
    Initialized,
    Paused,
    Locked,
}
