use soroban_sdk::{contracttype, Address};

#[contracttype]
#[derive(Clone, Debug)]
pub struct StagesConfiguredEvent {
    pub stage_count: u32,
    pub sale_allocation: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct TokensDepositedEvent {
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ContributedEvent {
    pub participant: Address,
    pub paid: i128,
    pub tokens: i128,
    pub stage: u32,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RefundedEvent {
    pub participant: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimedEvent {
    pub participant: Address,
    pub tokens: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FinalizedEvent {
    pub total_raised: i128,
    pub lp_payment: i128,
    pub lp_tokens: i128,
    pub liquidity: i128,
    pub marketing: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MarketingCreditedEvent {
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MarketingWithdrawnEvent {
    pub recipient: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct TokensRecoveredEvent {
    pub to: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ForeignWithdrawnEvent {
    pub token: Address,
    pub to: Address,
    pub amount: i128,
}
