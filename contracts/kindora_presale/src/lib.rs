#![no_std]

mod allocation;
mod error;
mod events;
mod storage;


use allocation::{
    min_after_slippage, payment_for_tokens, percent_share, sub_to_floor, tokens_for_payment,
};
use error::Error;
use events::*;
use storage::{DataKey, Participant, SaleConfig, SaleTotals, Stage, MAX_SLIPPAGE_BPS};

use soroban_sdk::{contract, contractimpl, token, vec, Address, Env, IntoVal, Symbol, Vec};

#[contract]
pub struct KindoraPresale;

#[contractimpl]
impl KindoraPresale {
    // ============================================
    // INITIALIZATION & ADMIN
    // ============================================

    /// Initialize the presale with its roles and collaborator addresses.
    ///
    /// The pool address is pinned here and can never be changed; only the
    /// owner-chosen AMM is ever granted an allowance or invoked at finalize.
    ///
    /// # Errors
    /// - `AlreadyInitialized`: Contract already initialized
    pub fn initialize(
        env: Env,
        owner: Address,
        payment_token: Address,
        sale_token: Address,
        pool: Address,
        marketing_recipient: Address,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Initialized) {
            return Err(Error::AlreadyInitialized);
        }

        owner.require_auth();

        env.storage().instance().set(&DataKey::Initialized, &true);
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::PaymentToken, &payment_token);
        env.storage().instance().set(&DataKey::SaleToken, &sale_token);
        env.storage().instance().set(&DataKey::Pool, &pool);
        env.storage()
            .instance()
            .set(&DataKey::MarketingRecipient, &marketing_recipient);
        env.storage().instance().set(&DataKey::Paused, &false);

        let config = SaleConfig {
            start_time: 0,
            end_time: 0,
            soft_cap: 0,
            hard_cap: 0,
            min_contribution: 0,
            max_contribution: 0,
            lp_percent: 0,
            marketing_percent: 100,
            max_slippage_bps: 0,
            listing_rate: 0,
        };
        env.storage().instance().set(&DataKey::Config, &config);

        Ok(())
    }

    /// Pause contributions (emergency). Refund and claim stay open so
    /// participants always have an exit.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    pub fn pause(env: Env) -> Result<(), Error> {
        Self::require_owner(&env)?;
        env.storage().instance().set(&DataKey::Paused, &true);
        Ok(())
    }

    /// Resume contributions.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    pub fn unpause(env: Env) -> Result<(), Error> {
        Self::require_owner(&env)?;
        env.storage().instance().set(&DataKey::Paused, &false);
        Ok(())
    }

    // ============================================
    // CONFIGURATION (owner, pre-open only)
    // ============================================

    /// Set the contribution window.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidTimeWindow`: Start not in the future, or end not after start
    pub fn set_sale_window(env: Env, start_time: u64, end_time: u64) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if start_time <= env.ledger().timestamp() || end_time <= start_time {
            return Err(Error::InvalidTimeWindow);
        }

        config.start_time = start_time;
        config.end_time = end_time;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Set the fundraising bounds. A zero hard cap means unbounded.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidCapOrdering`: Soft cap not positive, or hard cap below soft cap
    pub fn set_caps(env: Env, soft_cap: i128, hard_cap: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if soft_cap <= 0 || hard_cap < 0 {
            return Err(Error::InvalidCapOrdering);
        }
        if hard_cap != 0 && hard_cap < soft_cap {
            return Err(Error::InvalidCapOrdering);
        }

        config.soft_cap = soft_cap;
        config.hard_cap = hard_cap;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Set the per-participant contribution bounds. Zero means unbounded.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidLimitOrdering`: Negative bound, or maximum below minimum
    pub fn set_contribution_limits(env: Env, min: i128, max: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if min < 0 || max < 0 {
            return Err(Error::InvalidLimitOrdering);
        }
        if max != 0 && max < min {
            return Err(Error::InvalidLimitOrdering);
        }

        config.min_contribution = min;
        config.max_contribution = max;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Set how the raise is split between liquidity and marketing.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidSplit`: Shares do not sum to exactly 100
    pub fn set_distribution_split(
        env: Env,
        lp_percent: u32,
        marketing_percent: u32,
    ) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if lp_percent.checked_add(marketing_percent) != Some(100) {
            return Err(Error::InvalidSplit);
        }

        config.lp_percent = lp_percent;
        config.marketing_percent = marketing_percent;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Set the slippage bound applied to both liquidity legs.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidSlippage`: Bound above 3,000 basis points
    pub fn set_max_slippage(env: Env, max_slippage_bps: u32) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if max_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(Error::InvalidSlippage);
        }

        config.max_slippage_bps = max_slippage_bps;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Set the listing rate used to size the liquidity deposit at finalize.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `InvalidListingRate`: Rate not positive
    pub fn set_listing_rate(env: Env, listing_rate: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if listing_rate <= 0 {
            return Err(Error::InvalidListingRate);
        }

        config.listing_rate = listing_rate;
        env.storage().instance().set(&DataKey::Config, &config);
        Ok(())
    }

    /// Replace the stage table. Resets the stage cursor and recomputes the
    /// sale-wide allocation as the sum of the stage allocations.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleStarted`: Sale window already open
    /// - `StageTableShape`: Empty table or mismatched array lengths
    /// - `InvalidStageEntry`: Stage with zero allocation or zero rate
    pub fn set_stages(
        env: Env,
        allocations: Vec<i128>,
        rates: Vec<i128>,
    ) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let config = Self::config(&env)?;
        Self::check_not_started(&env, &config)?;

        if allocations.len() == 0 || allocations.len() != rates.len() {
            return Err(Error::StageTableShape);
        }

        let mut stages: Vec<Stage> = Vec::new(&env);
        let mut sale_allocation: i128 = 0;
        for i in 0..allocations.len() {
            let token_allocation = allocations.get(i).ok_or(Error::StageTableShape)?;
            let rate = rates.get(i).ok_or(Error::StageTableShape)?;
            if token_allocation <= 0 || rate <= 0 {
                return Err(Error::InvalidStageEntry);
            }
            sale_allocation = sale_allocation
                .checked_add(token_allocation)
                .ok_or(Error::ArithmeticError)?;
            stages.push_back(Stage {
                token_allocation,
                rate,
            });
        }

        let mut totals = Self::totals(&env);
        totals.sale_allocation = sale_allocation;
        totals.current_stage = 0;
        totals.stage_sold = 0;

        env.storage().instance().set(&DataKey::Stages, &stages);
        env.storage().instance().set(&DataKey::Totals, &totals);

        env.events().publish(
            (Symbol::new(&env, "stages_configured"),),
            StagesConfiguredEvent {
                stage_count: stages.len(),
                sale_allocation,
            },
        );

        Ok(())
    }

    /// Move custody tokens from the owner into the contract. The sale
    /// cannot settle unless custody covers sold tokens plus the liquidity
    /// requirement.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `AlreadyFinalized`: Sale already settled
    /// - `InvalidAmount`: Amount not positive
    pub fn deposit_sale_tokens(env: Env, amount: i128) -> Result<(), Error> {
        let owner = Self::require_owner(&env)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        if Self::totals(&env).finalized {
            return Err(Error::AlreadyFinalized);
        }

        let sale_token = Self::sale_token(&env)?;
        token::Client::new(&env, &sale_token).transfer(
            &owner,
            &env.current_contract_address(),
            &amount,
        );

        env.events().publish(
            (Symbol::new(&env, "tokens_deposited"),),
            TokensDepositedEvent { amount },
        );

        Ok(())
    }

    // ============================================
    // CONTRIBUTION
    // ============================================

    /// Contribute payment tokens against the active pricing stage.
    ///
    /// Only the payment that the granted tokens are exactly worth is pulled
    /// from the participant; the remainder of `amount` never moves. A
    /// contribution that cannot be fully satisfied at the active stage's
    /// rate is rejected rather than partially filled or spilled into the
    /// next stage.
    ///
    /// Returns `(paid, tokens)`.
    ///
    /// # Errors
    /// - `SalePaused`: Contributions paused by the owner
    /// - `SaleNotOpen`: Window not open or no stage table configured
    /// - `SaleSoldOut`: Entire sale allocation already sold
    /// - `InvalidAmount`: Amount not positive
    /// - `BelowMinContribution`: Amount below the per-transaction minimum
    /// - `AboveMaxContribution`: Participant total would exceed the maximum
    /// - `HardCapExceeded`: Raise would exceed the hard cap
    /// - `DustContribution`: Amount buys zero tokens at the stage rate
    /// - `StageExhausted`: Active stage has no remaining tokens
    /// - `ExceedsStage`: Purchase larger than the stage's remaining tokens
    pub fn contribute(env: Env, participant: Address, amount: i128) -> Result<(i128, i128), Error> {
        participant.require_auth();
        Self::check_not_paused(&env)?;
        Self::acquire_lock(&env)?;

        let config = Self::config(&env)?;
        let now = env.ledger().timestamp();
        if config.start_time == 0 || now < config.start_time || now >= config.end_time {
            return Err(Error::SaleNotOpen);
        }

        let stages = Self::stages(&env);
        let mut totals = Self::totals(&env);
        if stages.len() == 0 || totals.current_stage >= stages.len() {
            return Err(Error::SaleNotOpen);
        }
        if totals.tokens_sold >= totals.sale_allocation {
            return Err(Error::SaleSoldOut);
        }

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        if amount < config.min_contribution {
            return Err(Error::BelowMinContribution);
        }

        let mut record = Self::participant_record(&env, &participant);
        let prospective_total = record
            .contributed
            .checked_add(amount)
            .ok_or(Error::ArithmeticError)?;
        if config.max_contribution > 0 && prospective_total > config.max_contribution {
            return Err(Error::AboveMaxContribution);
        }

        let prospective_raised = totals
            .total_raised
            .checked_add(amount)
            .ok_or(Error::ArithmeticError)?;
        if config.hard_cap > 0 && prospective_raised > config.hard_cap {
            return Err(Error::HardCapExceeded);
        }

        let stage_index = totals.current_stage;
        let stage = stages.get(stage_index).ok_or(Error::SaleNotOpen)?;

        let tokens = tokens_for_payment(amount, stage.rate).ok_or(Error::ArithmeticError)?;
        if tokens == 0 {
            return Err(Error::DustContribution);
        }

        let remaining = stage.token_allocation - totals.stage_sold;
        if remaining <= 0 {
            return Err(Error::StageExhausted);
        }
        if tokens > remaining {
            return Err(Error::ExceedsStage);
        }

        let paid = payment_for_tokens(tokens, stage.rate).ok_or(Error::ArithmeticError)?;
        if paid > amount {
            // unreachable by the floor/ceil pairing, asserted anyway
            return Err(Error::ArithmeticError);
        }

        let payment_token = Self::payment_token(&env)?;
        token::Client::new(&env, &payment_token).transfer(
            &participant,
            &env.current_contract_address(),
            &paid,
        );

        record.contributed = record
            .contributed
            .checked_add(paid)
            .ok_or(Error::ArithmeticError)?;
        record.entitled = record
            .entitled
            .checked_add(tokens)
            .ok_or(Error::ArithmeticError)?;

        totals.total_raised = totals
            .total_raised
            .checked_add(paid)
            .ok_or(Error::ArithmeticError)?;
        totals.tokens_sold = totals
            .tokens_sold
            .checked_add(tokens)
            .ok_or(Error::ArithmeticError)?;
        totals.stage_sold = totals
            .stage_sold
            .checked_add(tokens)
            .ok_or(Error::ArithmeticError)?;

        // Advance to the next tier on an exact fill. The last stage never
        // advances; the sale simply has no remaining capacity.
        if totals.stage_sold == stage.token_allocation && stage_index + 1 < stages.len() {
            totals.current_stage = stage_index + 1;
            totals.stage_sold = 0;
        }

        env.storage()
            .instance()
            .set(&DataKey::Participant(participant.clone()), &record);
        env.storage().instance().set(&DataKey::Totals, &totals);

        env.events().publish(
            (Symbol::new(&env, "contributed"), participant.clone()),
            ContributedEvent {
                participant,
                paid,
                tokens,
                stage: stage_index,
            },
        );

        Self::release_lock(&env);
        Ok((paid, tokens))
    }

    // ============================================
    // REFUND & CLAIM
    // ============================================

    /// Return a participant's full contribution after a failed sale.
    ///
    /// Only reachable once the window has closed with the raise below the
    /// soft cap. State is zeroed before the transfer out
    /// (checks-effects-interactions); a second call sees an empty record.
    ///
    /// # Errors
    /// - `SaleNotEnded`: Window still open
    /// - `SoftCapMet`: Raise met the soft cap, refunds unavailable
    /// - `NoContribution`: Nothing recorded for this participant
    pub fn refund(env: Env, participant: Address) -> Result<i128, Error> {
        participant.require_auth();
        Self::acquire_lock(&env)?;

        let config = Self::config(&env)?;
        let mut totals = Self::totals(&env);
        if !Self::ended(&env, &config, &totals) {
            return Err(Error::SaleNotEnded);
        }
        if totals.total_raised >= config.soft_cap {
            return Err(Error::SoftCapMet);
        }

        let record = Self::participant_record(&env, &participant);
        if record.contributed == 0 {
            return Err(Error::NoContribution);
        }
        let amount = record.contributed;
        let entitled = record.entitled;

        env.storage().instance().set(
            &DataKey::Participant(participant.clone()),
            &Participant {
                contributed: 0,
                entitled: 0,
            },
        );
        totals.total_raised = sub_to_floor(totals.total_raised, amount);
        totals.tokens_sold = sub_to_floor(totals.tokens_sold, entitled);
        env.storage().instance().set(&DataKey::Totals, &totals);

        let payment_token = Self::payment_token(&env)?;
        token::Client::new(&env, &payment_token).transfer(
            &env.current_contract_address(),
            &participant,
            &amount,
        );

        env.events().publish(
            (Symbol::new(&env, "refunded"), participant.clone()),
            RefundedEvent {
                participant,
                amount,
            },
        );

        Self::release_lock(&env);
        Ok(amount)
    }

    /// Transfer a participant's entitled tokens after a successful,
    /// finalized sale. A second call sees an empty record.
    ///
    /// # Errors
    /// - `NotFinalized`: Sale not settled yet
    /// - `NoTokens`: Nothing entitled for this participant
    pub fn claim(env: Env, participant: Address) -> Result<i128, Error> {
        participant.require_auth();
        Self::acquire_lock(&env)?;

        let mut totals = Self::totals(&env);
        if !totals.finalized {
            return Err(Error::NotFinalized);
        }

        let record = Self::participant_record(&env, &participant);
        if record.entitled == 0 {
            return Err(Error::NoTokens);
        }
        let tokens = record.entitled;

        env.storage().instance().set(
            &DataKey::Participant(participant.clone()),
            &Participant {
                contributed: 0,
                entitled: 0,
            },
        );
        totals.tokens_claimed = totals
            .tokens_claimed
            .checked_add(tokens)
            .ok_or(Error::ArithmeticError)?;
        env.storage().instance().set(&DataKey::Totals, &totals);

        let sale_token = Self::sale_token(&env)?;
        token::Client::new(&env, &sale_token).transfer(
            &env.current_contract_address(),
            &participant,
            &tokens,
        );

        env.events().publish(
            (Symbol::new(&env, "claimed"), participant.clone()),
            ClaimedEvent {
                participant,
                tokens,
            },
        );

        Self::release_lock(&env);
        Ok(tokens)
    }

    // ============================================
    // FINALIZATION
    // ============================================

    /// Settle a successful sale: commit the liquidity share of the raise to
    /// the pinned pool, credit the remainder to marketing, return surplus
    /// custody tokens to the owner, and unlock claims. Callable by anyone,
    /// exactly once.
    ///
    /// Custody must cover tokens already owed to claimants plus the tokens
    /// about to be committed to liquidity, whether or not a hard cap is
    /// configured. Any pool failure aborts the whole call.
    ///
    /// # Errors
    /// - `AlreadyFinalized`: Finalize already completed
    /// - `SaleNotEnded`: Window still open and allocation not sold out
    /// - `SoftCapNotMet`: Raise below the soft cap
    /// - `InvalidListingRate`: Liquidity share configured without a listing rate
    /// - `InsufficientCustody`: Custody below sold tokens plus liquidity need
    pub fn finalize(env: Env) -> Result<(), Error> {
        Self::acquire_lock(&env)?;

        let config = Self::config(&env)?;
        let mut totals = Self::totals(&env);
        if totals.finalized {
            return Err(Error::AlreadyFinalized);
        }
        if !Self::ended(&env, &config, &totals) {
            return Err(Error::SaleNotEnded);
        }
        if totals.total_raised < config.soft_cap {
            return Err(Error::SoftCapNotMet);
        }

        let contract = env.current_contract_address();
        let payment_token = Self::payment_token(&env)?;
        let sale_token = Self::sale_token(&env)?;
        let payment_client = token::Client::new(&env, &payment_token);
        let sale_client = token::Client::new(&env, &sale_token);

        let balance = payment_client.balance(&contract);
        let lp_share = percent_share(balance, config.lp_percent).ok_or(Error::ArithmeticError)?;
        let lp_tokens = if lp_share > 0 {
            if config.listing_rate <= 0 {
                return Err(Error::InvalidListingRate);
            }
            tokens_for_payment(lp_share, config.listing_rate).ok_or(Error::ArithmeticError)?
        } else {
            0
        };

        let required = totals
            .tokens_sold
            .checked_add(lp_tokens)
            .ok_or(Error::ArithmeticError)?;
        if sale_client.balance(&contract) < required {
            return Err(Error::InsufficientCustody);
        }

        let mut lp_payment_used: i128 = 0;
        let mut lp_tokens_used: i128 = 0;
        let mut liquidity: i128 = 0;
        if lp_share > 0 {
            let min_tokens =
                min_after_slippage(lp_tokens, config.max_slippage_bps).ok_or(Error::ArithmeticError)?;
            let min_payment =
                min_after_slippage(lp_share, config.max_slippage_bps).ok_or(Error::ArithmeticError)?;

            let pool = Self::pool(&env)?;
            let live_until = env.ledger().sequence() + 100;

            // Allowance discipline for approval-race-sensitive tokens:
            // reset to zero, grant the exact amount, reset to zero after.
            sale_client.approve(&contract, &pool, &0, &live_until);
            sale_client.approve(&contract, &pool, &lp_tokens, &live_until);
            payment_client.approve(&contract, &pool, &0, &live_until);
            payment_client.approve(&contract, &pool, &lp_share, &live_until);

            let deadline = env.ledger().timestamp();
            let (tokens_used, payment_used, minted): (i128, i128, i128) = env.invoke_contract(
                &pool,
                &Symbol::new(&env, "add_liquidity"),
                vec![
                    &env,
                    contract.to_val(),
                    sale_token.to_val(),
                    payment_token.to_val(),
                    lp_tokens.into_val(&env),
                    lp_share.into_val(&env),
                    min_tokens.into_val(&env),
                    min_payment.into_val(&env),
                    deadline.into_val(&env),
                ],
            );
            lp_tokens_used = tokens_used;
            lp_payment_used = payment_used;
            liquidity = minted;

            sale_client.approve(&contract, &pool, &0, &live_until);
            payment_client.approve(&contract, &pool, &0, &live_until);
        }

        // Everything the pool did not consume is pull-payable marketing
        // budget, including any shortfall from a rebalanced ratio.
        let marketing = sub_to_floor(balance, lp_payment_used);
        if marketing > 0 {
            totals.marketing_pending = totals
                .marketing_pending
                .checked_add(marketing)
                .ok_or(Error::ArithmeticError)?;
            env.events().publish(
                (Symbol::new(&env, "marketing_credited"),),
                MarketingCreditedEvent { amount: marketing },
            );
        }

        // Custody beyond what claimants are owed goes back to the owner.
        let leftover = sub_to_floor(sale_client.balance(&contract), totals.tokens_sold);
        if leftover > 0 {
            let owner: Address = env
                .storage()
                .instance()
                .get(&DataKey::Owner)
                .ok_or(Error::NotInitialized)?;
            sale_client.transfer(&contract, &owner, &leftover);
        }

        totals.finalized = true;
        env.storage().instance().set(&DataKey::Totals, &totals);

        env.events().publish(
            (Symbol::new(&env, "finalized"),),
            FinalizedEvent {
                total_raised: totals.total_raised,
                lp_payment: lp_payment_used,
                lp_tokens: lp_tokens_used,
                liquidity,
                marketing,
            },
        );

        Self::release_lock(&env);
        Ok(())
    }

    /// Pull the accumulated marketing balance. Only the designated
    /// marketing recipient may call; the balance is zeroed before the
    /// transfer out.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NothingPending`: No marketing balance accumulated
    pub fn withdraw_marketing(env: Env) -> Result<i128, Error> {
        let recipient: Address = env
            .storage()
            .instance()
            .get(&DataKey::MarketingRecipient)
            .ok_or(Error::NotInitialized)?;
        recipient.require_auth();
        Self::acquire_lock(&env)?;

        let mut totals = Self::totals(&env);
        if totals.marketing_pending == 0 {
            return Err(Error::NothingPending);
        }
        let amount = totals.marketing_pending;
        totals.marketing_pending = 0;
        env.storage().instance().set(&DataKey::Totals, &totals);

        let payment_token = Self::payment_token(&env)?;
        token::Client::new(&env, &payment_token).transfer(
            &env.current_contract_address(),
            &recipient,
            &amount,
        );

        env.events().publish(
            (Symbol::new(&env, "marketing_withdrawn"), recipient.clone()),
            MarketingWithdrawnEvent { recipient, amount },
        );

        Self::release_lock(&env);
        Ok(amount)
    }

    /// Reclaim the full custody token balance after a failed sale.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `SaleNotEnded`: Window still open
    /// - `SoftCapMet`: Raise met the soft cap, recovery unavailable
    pub fn recover_tokens_on_failure(env: Env, to: Address) -> Result<i128, Error> {
        Self::require_owner(&env)?;
        Self::acquire_lock(&env)?;

        let config = Self::config(&env)?;
        let totals = Self::totals(&env);
        if !Self::ended(&env, &config, &totals) {
            return Err(Error::SaleNotEnded);
        }
        if totals.total_raised >= config.soft_cap {
            return Err(Error::SoftCapMet);
        }

        let sale_token = Self::sale_token(&env)?;
        let sale_client = token::Client::new(&env, &sale_token);
        let amount = sale_client.balance(&env.current_contract_address());
        if amount > 0 {
            sale_client.transfer(&env.current_contract_address(), &to, &amount);
        }

        env.events().publish(
            (Symbol::new(&env, "tokens_recovered"), to.clone()),
            TokensRecoveredEvent { to, amount },
        );

        Self::release_lock(&env);
        Ok(amount)
    }

    /// Withdraw an asset stranded in the contract after settlement. Custody
    /// tokens still owed to claimants and payment tokens held for marketing
    /// can never be withdrawn this way.
    ///
    /// # Errors
    /// - `NotInitialized`: Contract not initialized
    /// - `NotFinalized`: Sale not settled yet
    /// - `InvalidAmount`: Amount not positive
    /// - `CustodyProtected`: Amount dips into balances owed to participants
    pub fn emergency_withdraw(
        env: Env,
        asset: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), Error> {
        Self::require_owner(&env)?;
        Self::acquire_lock(&env)?;

        let totals = Self::totals(&env);
        if !totals.finalized {
            return Err(Error::NotFinalized);
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let sale_token = Self::sale_token(&env)?;
        let payment_token = Self::payment_token(&env)?;
        let reserved = if asset == sale_token {
            sub_to_floor(totals.tokens_sold, totals.tokens_claimed)
        } else if asset == payment_token {
            totals.marketing_pending
        } else {
            0
        };

        let client = token::Client::new(&env, &asset);
        let balance = client.balance(&env.current_contract_address());
        if amount > sub_to_floor(balance, reserved) {
            return Err(Error::CustodyProtected);
        }

        client.transfer(&env.current_contract_address(), &to, &amount);

        env.events().publish(
            (Symbol::new(&env, "foreign_withdrawn"), asset.clone()),
            ForeignWithdrawnEvent {
                token: asset,
                to,
                amount,
            },
        );

        Self::release_lock(&env);
        Ok(())
    }

    // ============================================
    // VIEW FUNCTIONS
    // ============================================

    /// Get the sale configuration
    pub fn get_config(env: Env) -> Result<SaleConfig, Error> {
        Self::config(&env)
    }

    /// Get the stage table
    pub fn get_stages(env: Env) -> Vec<Stage> {
        Self::stages(&env)
    }

    /// Get the running sale totals
    pub fn get_totals(env: Env) -> SaleTotals {
        Self::totals(&env)
    }

    /// Get a participant's record (zero record for unknown addresses)
    pub fn get_participant(env: Env, participant: Address) -> Participant {
        Self::participant_record(&env, &participant)
    }

    /// Whether contributions are currently possible
    pub fn presale_active(env: Env) -> bool {
        let config = match Self::config(&env) {
            Ok(config) => config,
            Err(_) => return false,
        };
        let totals = Self::totals(&env);
        let stages = Self::stages(&env);
        let now = env.ledger().timestamp();

        config.start_time != 0
            && now >= config.start_time
            && now < config.end_time
            && !totals.finalized
            && totals.tokens_sold < totals.sale_allocation
            && totals.current_stage < stages.len()
    }

    /// Whether the sale window has closed or the allocation has sold out
    pub fn presale_ended(env: Env) -> bool {
        let config = match Self::config(&env) {
            Ok(config) => config,
            Err(_) => return false,
        };
        Self::ended(&env, &config, &Self::totals(&env))
    }

    /// Whether the raise has met the soft cap
    pub fn soft_cap_met(env: Env) -> bool {
        let config = match Self::config(&env) {
            Ok(config) => config,
            Err(_) => return false,
        };
        Self::totals(&env).total_raised >= config.soft_cap
    }

    /// Whether contributions are paused
    pub fn is_paused(env: Env) -> bool {
        env.storage()
            .instance()
            .get::<DataKey, bool>(&DataKey::Paused)
            .unwrap_or(false)
    }

    // ============================================
    // INTERNAL HELPERS
    // ============================================

    fn require_owner(env: &Env) -> Result<Address, Error> {
        let owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)?;
        owner.require_auth();
        Ok(owner)
    }

    fn config(env: &Env) -> Result<SaleConfig, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(Error::NotInitialized)
    }

    fn totals(env: &Env) -> SaleTotals {
        env.storage()
            .instance()
            .get(&DataKey::Totals)
            .unwrap_or(SaleTotals {
                total_raised: 0,
                tokens_sold: 0,
                tokens_claimed: 0,
                sale_allocation: 0,
                current_stage: 0,
                stage_sold: 0,
                marketing_pending: 0,
                finalized: false,
            })
    }

    fn stages(env: &Env) -> Vec<Stage> {
        env.storage()
            .instance()
            .get(&DataKey::Stages)
            .unwrap_or(Vec::new(env))
    }

    fn participant_record(env: &Env, participant: &Address) -> Participant {
        env.storage()
            .instance()
            .get(&DataKey::Participant(participant.clone()))
            .unwrap_or(Participant {
                contributed: 0,
                entitled: 0,
            })
    }

    fn payment_token(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::PaymentToken)
            .ok_or(Error::NotInitialized)
    }

    fn sale_token(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::SaleToken)
            .ok_or(Error::NotInitialized)
    }

    fn pool(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Pool)
            .ok_or(Error::NotInitialized)
    }

    fn check_not_started(env: &Env, config: &SaleConfig) -> Result<(), Error> {
        if config.start_time != 0 && env.ledger().timestamp() >= config.start_time {
            return Err(Error::SaleStarted);
        }
        Ok(())
    }

    fn check_not_paused(env: &Env) -> Result<(), Error> {
        let paused = env
            .storage()
            .instance()
            .get::<DataKey, bool>(&DataKey::Paused)
            .unwrap_or(false);

        if paused {
            return Err(Error::SalePaused);
        }
        Ok(())
    }

    fn ended(env: &Env, config: &SaleConfig, totals: &SaleTotals) -> bool {
        env.ledger().timestamp() >= config.end_time
            || (totals.sale_allocation > 0 && totals.tokens_sold >= totals.sale_allocation)
    }

    // A failed entry point rolls the flag back with the rest of the
    // transaction, so the lock cannot stick across calls.
    fn acquire_lock(env: &Env) -> Result<(), Error> {
        if env
            .storage()
            .instance()
            .get::<DataKey, bool>(&DataKey::Locked)
            .unwrap_or(false)
        {
            return Err(Error::ReentrantCall);
        }
        env.storage().instance().set(&DataKey::Locked, &true);
        Ok(())
    }

    fn release_lock(env: &Env) {
        env.storage().instance().set(&DataKey::Locked, &false);
    }
}
