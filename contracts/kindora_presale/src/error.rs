use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ============================================
    // INITIALIZATION ERRORS (1-9)
    // ============================================
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,

    // ============================================
    // CONFIGURATION ERRORS (10-19)
    // ============================================
    /// Start time not in the future, or end not after start
    InvalidTimeWindow = 10,
    /// Soft cap not positive, or hard cap below soft cap
    InvalidCapOrdering = 11,
    /// Per-participant maximum below minimum
    InvalidLimitOrdering = 12,
    /// Liquidity and marketing shares must sum to 100
    InvalidSplit = 13,
    /// Slippage bound above the permitted maximum
    InvalidSlippage = 14,
    /// Listing rate must be positive
    InvalidListingRate = 15,
    /// Stage allocation and rate arrays empty or of differing length
    StageTableShape = 16,
    /// Stage with zero token allocation or zero rate
    InvalidStageEntry = 17,
    /// Configuration is frozen once the sale window opens
    SaleStarted = 18,

    // ============================================
    // AUTHORIZATION ERRORS (20-29)
    // ============================================
    /// Caller lacks the required role
    Unauthorized = 20,

    // ============================================
    // ELIGIBILITY ERRORS (30-39)
    // ============================================
    /// Sale window not open, or no stage table configured
    SaleNotOpen = 30,
    /// Entire sale allocation already sold
    SaleSoldOut = 31,
    /// Contribution below the per-transaction minimum
    BelowMinContribution = 32,
    /// Contribution would exceed the per-participant maximum
    AboveMaxContribution = 33,
    /// Contribution would push the raise past the hard cap
    HardCapExceeded = 34,
    /// Amount too small to buy any tokens at the current rate
    DustContribution = 35,
    /// Active stage has no remaining tokens
    StageExhausted = 36,
    /// Contribution exceeds the remaining capacity of the active stage
    ExceedsStage = 37,

    // ============================================
    // LIFECYCLE ERRORS (40-49)
    // ============================================
    /// Sale window still open
    SaleNotEnded = 40,
    /// Raise below soft cap, success path unavailable
    SoftCapNotMet = 41,
    /// Raise met soft cap, refund path permanently unavailable
    SoftCapMet = 42,
    /// Sale not finalized yet
    NotFinalized = 43,
    /// Finalize already completed
    AlreadyFinalized = 44,
    /// Participant has nothing to refund
    NoContribution = 45,
    /// Participant has nothing to claim
    NoTokens = 46,

    // ============================================
    // SETTLEMENT ERRORS (50-59)
    // ============================================
    /// Custody balance below tokens owed plus liquidity requirement
    InsufficientCustody = 50,
    /// No marketing balance to withdraw
    NothingPending = 51,
    /// Withdrawal would dip into balances owed to participants
    CustodyProtected = 52,
    /// Amount must be positive
    InvalidAmount = 53,

    // ============================================
    // ARITHMETIC ERRORS (60-69)
    // ============================================
    /// Overflow or a rounding invariant violation
    ArithmeticError = 60,

    // ============================================
    // OPERATIONAL ERRORS (70-79)
    // ============================================
    /// Contributions are paused
    SalePaused = 70,
    /// Nested entry into a guarded entry point
    ReentrantCall = 71,
}
