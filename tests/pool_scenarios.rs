//! End-to-end pool scenarios: joining, voting, execution and liquidation

use std::error::Error;
use std::sync::Arc;

use coffer::foundation::common::{AccountId, Amount, ErrorKind, ManualClock};
use coffer::foundation::config::{ConfigRegistry, ExpiryPolicy, PoolSettings, ThresholdRule};
use coffer::foundation::crypto::{sha256, AccountKey, Freshness, SignedIntent};
use coffer::systems::economic::calls::{encode, token, TransferArgs};
use coffer::systems::economic::{Environment, FixedSeed};
use coffer::systems::governance::{ProposalDraft, Transaction, VoteChoice};
use coffer::systems::pool::calls::LIQUIDATE_POOL;
use coffer::systems::pool::{CashoutIntent, JoinIntent, JoinRequestIntent};
use coffer::{LaunchParams, Pool};

type TestResult = Result<(), Box<dyn Error>>;

const DAY: u64 = 86_400;

struct World {
    env: Environment,
    clock: ManualClock,
    usdc: AccountId,
    relayer: AccountId,
}

impl World {
    fn new() -> Result<Self, Box<dyn Error>> {
        let clock = ManualClock::new(1_700_000_000);
        let config = ConfigRegistry::new(AccountId::derive("treasury"), 0)?;
        let mut env = Environment::new(config, Arc::new(clock.clone()));
        let usdc = env.assets.create_token("USDC")?;
        Ok(Self {
            env,
            clock,
            usdc,
            relayer: AccountId::derive("relayer"),
        })
    }

    fn launch(&mut self, creator: AccountId, settings: PoolSettings, whitelist: &[AccountId]) -> Result<Pool, Box<dyn Error>> {
        let params = LaunchParams::new("Collective", creator, self.usdc, settings)
            .with_whitelist(whitelist.iter().copied())
            .with_relayer(self.relayer);
        Ok(Pool::launch(&mut self.env, params, None)?.with_seed_source(Box::new(FixedSeed([1; 32]))))
    }

    fn approve(&mut self, pool: &Pool, holder: &AccountId, amount: Amount) -> Result<(), Box<dyn Error>> {
        self.env.assets.mint_token(&self.usdc, holder, amount)?;
        let current = self.env.assets.allowance(&self.usdc, holder, &pool.id())?;
        self.env.assets.approve(&self.usdc, holder, &pool.id(), current + amount)?;
        Ok(())
    }

    fn join(&mut self, pool: &mut Pool, holder: &AccountId, stake: Amount) -> Result<(), Box<dyn Error>> {
        self.approve(pool, holder, stake)?;
        pool.join(&mut self.env, *holder, stake, None)?;
        Ok(())
    }

    fn balance(&self, holder: &AccountId) -> Amount {
        self.env.assets.token_balance(&self.usdc, holder).unwrap_or(0)
    }

    fn payment(&self, to: AccountId, amount: Amount) -> Result<ProposalDraft, Box<dyn Error>> {
        let params = encode(&TransferArgs { to, amount })?;
        Ok(ProposalDraft::new("Payment", "Send currency out of the pool")
            .with_transaction(Transaction::new(self.usdc, token::TRANSFER, params)))
    }
}

fn alice() -> AccountId {
    AccountId::derive("alice")
}

fn bob() -> AccountId {
    AccountId::derive("bob")
}

fn carol() -> AccountId {
    AccountId::derive("carol")
}

fn standard_settings() -> PoolSettings {
    PoolSettings::new(10, 20).with_max_members(4).with_voting_threshold(51)
}

#[test]
fn test_approved_payment_executes() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[bob()])?;
    world.join(&mut pool, &alice(), 10)?;
    assert_eq!(pool.governance_tokens_of(&alice())?, 10);
    assert_eq!(pool.total_governance_tokens()?, 10);
    world.join(&mut pool, &bob(), 10)?;
    assert_eq!(pool.governance_tokens_of(&bob())?, 10);
    assert_eq!(pool.total_governance_tokens()?, 20);

    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;
    assert_eq!(pool.get_proposal(id)?.yes_votes, 10);
    pool.vote(&mut world.env, bob(), id, VoteChoice::Yes)?;
    pool.execute_proposal(&mut world.env, bob(), id)?;

    assert_eq!(world.balance(&pool.id()), 15);
    assert_eq!(world.balance(&alice()), 5);
    assert!(pool.get_proposal(id)?.executed);
    Ok(())
}

#[test]
fn test_tied_vote_cannot_execute() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[bob()])?;
    world.join(&mut pool, &alice(), 10)?;
    world.join(&mut pool, &bob(), 10)?;

    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;
    pool.vote(&mut world.env, bob(), id, VoteChoice::No)?;

    let err = pool.execute_proposal(&mut world.env, alice(), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(err.reason(), "Majority voted against execution");

    // Ties still lose once voting is over
    world.clock.advance(DAY);
    let err = pool.execute_proposal(&mut world.env, alice(), id).unwrap_err();
    assert_eq!(err.reason(), "Majority voted against execution");
    assert_eq!(world.balance(&pool.id()), 20);
    Ok(())
}

#[test]
fn test_one_unit_over_tie_executes() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[bob()])?;
    world.join(&mut pool, &alice(), 11)?;
    world.join(&mut pool, &bob(), 10)?;

    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;
    pool.vote(&mut world.env, bob(), id, VoteChoice::No)?;
    pool.execute_proposal(&mut world.env, bob(), id)?;
    assert_eq!(world.balance(&alice()), 5);
    Ok(())
}

fn threshold_outcome(rule: ThresholdRule, alice_stake: Amount, bob_stake: Amount) -> Result<bool, Box<dyn Error>> {
    let mut world = World::new()?;
    let settings = standard_settings()
        .with_voting_threshold(50)
        .with_threshold_rule(rule);
    let mut pool = world.launch(alice(), settings, &[bob()])?;
    world.join(&mut pool, &alice(), alice_stake)?;
    world.join(&mut pool, &bob(), bob_stake)?;
    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;
    match pool.execute_proposal(&mut world.env, alice(), id) {
        Ok(_) => Ok(true),
        Err(e) if e.reason() == "Voting still allowed" => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[test]
fn test_threshold_rules_at_the_boundary() -> TestResult {
    // Exactly 50% of the weight voted yes
    assert!(threshold_outcome(ThresholdRule::AtLeast, 10, 10)?);
    assert!(!threshold_outcome(ThresholdRule::StrictlyGreater, 10, 10)?);

    // One unit below and above
    assert!(!threshold_outcome(ThresholdRule::AtLeast, 10, 11)?);
    assert!(threshold_outcome(ThresholdRule::StrictlyGreater, 11, 10)?);
    Ok(())
}

#[test]
fn test_unopposed_proposal_executes_after_deadline() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[bob()])?;
    world.join(&mut pool, &alice(), 10)?;
    world.join(&mut pool, &bob(), 10)?;
    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;

    let err = pool.execute_proposal(&mut world.env, alice(), id).unwrap_err();
    assert_eq!(err.reason(), "Voting still allowed");

    // Past the deadline, Yes outweighing No is enough
    world.clock.advance(10 * DAY);
    pool.execute_proposal(&mut world.env, alice(), id)?;
    assert_eq!(world.balance(&alice()), 5);

    let err = pool.vote(&mut world.env, bob(), id, VoteChoice::No).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    Ok(())
}

#[test]
fn test_expiry_window_rejects_stale_proposals() -> TestResult {
    let mut world = World::new()?;
    let settings = standard_settings().with_expiry(ExpiryPolicy::Window { seconds: 3_600 });
    let mut pool = world.launch(alice(), settings, &[bob()])?;
    world.join(&mut pool, &alice(), 10)?;
    world.join(&mut pool, &bob(), 10)?;
    let draft = world.payment(alice(), 5)?;
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;

    world.clock.advance(DAY + 3_601);
    let err = pool.execute_proposal(&mut world.env, alice(), id).unwrap_err();
    assert_eq!(err.reason(), "Proposal expired");
    assert_eq!(world.balance(&pool.id()), 20);
    Ok(())
}

#[test]
fn test_never_voted_proposal_moves_nothing() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[bob()])?;
    world.join(&mut pool, &alice(), 10)?;

    let dave = AccountKey::from_seed(b"dave")?;
    world.approve(&pool, &dave.account_id(), 10)?;
    let request = SignedIntent::sign(
        &dave,
        &pool.id(),
        JoinRequestIntent {
            amount: 10,
            shares: 10,
            title: "Dave".into(),
            description: String::new(),
        },
        Freshness::Nonce(0),
    );
    let relayer = world.relayer;
    let id = pool.create_join_proposal(&mut world.env, &relayer, &request)?;

    world.clock.advance(2 * DAY);
    let err = pool.execute_proposal(&mut world.env, alice(), id).unwrap_err();
    assert_eq!(err.reason(), "Proposal has no support");
    assert_eq!(world.balance(&pool.id()), 10);
    assert_eq!(world.balance(&dave.account_id()), 10);
    assert!(!pool.is_member(&dave.account_id())?);
    Ok(())
}

#[test]
fn test_liquidation_pays_out_by_share() -> TestResult {
    let mut world = World::new()?;
    let settings = PoolSettings::new(5, 20).with_max_members(4);
    let mut pool = world.launch(alice(), settings, &[bob(), carol()])?;
    world.join(&mut pool, &alice(), 10)?;
    world.join(&mut pool, &bob(), 5)?;
    world.join(&mut pool, &carol(), 7)?;
    assert_eq!(world.balance(&pool.id()), 22);
    assert_eq!(pool.total_governance_tokens()?, 22);

    let draft = ProposalDraft::new("Liquidate", "Return everything")
        .with_transaction(Transaction::new(pool.id(), LIQUIDATE_POOL, Vec::new()));
    let id = pool.create_proposal(&mut world.env, alice(), draft)?;
    pool.vote(&mut world.env, bob(), id, VoteChoice::Yes)?;
    pool.execute_proposal(&mut world.env, carol(), id)?;

    assert_eq!(world.balance(&alice()), 10);
    assert_eq!(world.balance(&bob()), 5);
    assert_eq!(world.balance(&carol()), 7);
    assert_eq!(world.balance(&pool.id()), 0);
    assert!(pool.is_liquidated());
    assert_eq!(pool.governance_tokens_of(&alice()).unwrap_err().kind(), ErrorKind::State);
    assert_eq!(pool.total_governance_tokens().unwrap_err().kind(), ErrorKind::State);
    Ok(())
}

#[test]
fn test_secret_invite_uses() -> TestResult {
    let mut world = World::new()?;
    let mut pool = world.launch(alice(), standard_settings(), &[])?;
    world.join(&mut pool, &alice(), 10)?;
    let secret = b"open sesame";
    pool.add_to_whitelist_with_secret(alice(), sha256(secret), 2)?;
    assert_eq!(pool.secret_uses(secret)?, Some(2));

    for guest in [bob(), carol()] {
        world.approve(&pool, &guest, 10)?;
        pool.join(&mut world.env, guest, 10, Some(secret))?;
    }
    assert_eq!(pool.secret_uses(secret)?, Some(0));

    let dave = AccountId::derive("dave");
    world.approve(&pool, &dave, 10)?;
    let err = pool.join(&mut world.env, dave, 10, Some(secret)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Membership);

    let err = pool
        .add_to_whitelist_with_secret(alice(), sha256(secret), 5)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[test]
fn test_replayed_join_signature_is_refused() -> TestResult {
    let mut world = World::new()?;
    let alice_key = AccountKey::from_seed(b"alice")?;
    let alice = alice_key.account_id();
    let mut pool = world.launch(alice, standard_settings(), &[])?;
    let relayer = world.relayer;

    world.approve(&pool, &alice, 20)?;
    let join = SignedIntent::sign(
        &alice_key,
        &pool.id(),
        JoinIntent { stake: 10, secret: None },
        Freshness::Nonce(0),
    );
    pool.join_for(&mut world.env, &relayer, &join)?;

    let cashout = SignedIntent::sign(&alice_key, &pool.id(), CashoutIntent, Freshness::Nonce(1));
    pool.cashout_for(&mut world.env, &relayer, &cashout)?;
    assert_eq!(pool.nonce_of(&alice)?, 2);

    let err = pool.join_for(&mut world.env, &relayer, &join).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(!pool.is_member(&alice)?);
    Ok(())
}
