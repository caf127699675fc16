//! Orchestration tests for prophecy-deploy.
//!
//! These tests drive the full deploy -> ownership -> provision -> verify
//! pipeline against an in-memory prediction contract, so they need no node.
//! Run with: cargo test --test orchestrator_test

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_core::primitives::{Address, B256};
use anyhow::{Result, bail};
use prophecy_deploy::{
    Catalog, ContractVariant, DeploymentResult, EventSpec, OwnershipCheck, OwnershipMode,
    ProvisionStatus, ProvisionSummary, RunMode, RunPlan, RunReport, Target,
    contract::{
        ContractFactory, PendingTx, PredictionContract, PredictionStats, RoundInfo, TxReceipt,
    },
    error::{DeploymentError, NotOwnerError, PreconditionError, RunError},
    provision, run,
};

const CONTRACT: Address = Address::repeat_byte(0xc0);
const OWNER: Address = Address::repeat_byte(0x01);
const STRANGER: Address = Address::repeat_byte(0x02);

/// Shared state of the in-memory ledger.
#[derive(Default)]
struct Ledger {
    owner: Address,
    events: Vec<EventSpec>,
    create_calls: usize,
    /// `createEvent` call numbers (0-based) whose submission is rejected.
    reject_calls: HashSet<usize>,
    /// `createEvent` call numbers whose transaction reverts.
    revert_calls: HashSet<usize>,
    /// `createEvent` call numbers whose confirmation never arrives.
    stall_calls: HashSet<usize>,
    /// Mined transactions and whether they succeeded.
    receipts: HashMap<B256, bool>,
    fail_queries: bool,
    fail_count_query: bool,
    reject_deploy: bool,
    revert_deploy: bool,
    tx_counter: u64,
}

impl Ledger {
    fn next_hash(&mut self) -> B256 {
        self.tx_counter += 1;
        B256::left_padding_from(&self.tx_counter.to_be_bytes())
    }
}

#[derive(Clone)]
struct MockContract {
    address: Address,
    ledger: Arc<Mutex<Ledger>>,
}

impl MockContract {
    fn event(&self, record_id: u64) -> Result<EventSpec> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.fail_queries {
            bail!("execution reverted");
        }
        match ledger.events.get(record_id as usize) {
            Some(event) => Ok(event.clone()),
            None => bail!("Event does not exist"),
        }
    }
}

impl PredictionContract for MockContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn owner(&self) -> Result<Address> {
        Ok(self.ledger.lock().unwrap().owner)
    }

    async fn total_events(&self) -> Result<u64> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.fail_count_query {
            bail!("connection refused");
        }
        Ok(ledger.events.len() as u64)
    }

    async fn create_event(&self, spec: &EventSpec) -> Result<PendingTx> {
        let mut ledger = self.ledger.lock().unwrap();
        let call = ledger.create_calls;
        ledger.create_calls += 1;

        if ledger.reject_calls.contains(&call) {
            bail!("replacement transaction underpriced");
        }

        let hash = ledger.next_hash();
        if ledger.stall_calls.contains(&call) {
            return Ok(PendingTx { hash });
        }

        let success = !ledger.revert_calls.contains(&call);
        if success {
            ledger.events.push(spec.clone());
        }
        ledger.receipts.insert(hash, success);
        Ok(PendingTx { hash })
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<TxReceipt> {
        let ledger = self.ledger.lock().unwrap();
        match ledger.receipts.get(&tx.hash) {
            Some(success) => Ok(TxReceipt {
                transaction_hash: tx.hash,
                block_number: Some(ledger.tx_counter),
                success: *success,
                contract_address: None,
            }),
            None => bail!("Timeout waiting for receipt of {}", tx.hash),
        }
    }

    async fn current_round_info(&self, record_id: u64) -> Result<RoundInfo> {
        let event = self.event(record_id)?;
        Ok(RoundInfo {
            round_id: 1,
            is_active: true,
            time_remaining: event.duration_seconds,
        })
    }

    async fn is_guess_time_active(&self, record_id: u64) -> Result<bool> {
        self.event(record_id).map(|_| true)
    }

    async fn prediction_stats(&self, record_id: u64) -> Result<PredictionStats> {
        self.event(record_id)?;
        Ok(PredictionStats {
            total_predictions: 0,
            is_finalized: false,
            is_active: true,
        })
    }
}

struct MockFactory {
    ledger: Arc<Mutex<Ledger>>,
}

impl MockFactory {
    fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap()
    }
}

impl ContractFactory for MockFactory {
    type Contract = MockContract;

    async fn deploy(&self) -> Result<PendingTx> {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger.reject_deploy {
            bail!("insufficient funds for gas * price + value");
        }
        let hash = ledger.next_hash();
        Ok(PendingTx { hash })
    }

    async fn wait_for_deployment(&self, pending: &PendingTx) -> Result<TxReceipt> {
        let ledger = self.ledger.lock().unwrap();
        Ok(TxReceipt {
            transaction_hash: pending.hash,
            block_number: Some(1),
            success: !ledger.revert_deploy,
            contract_address: (!ledger.revert_deploy).then_some(CONTRACT),
        })
    }

    fn attach(&self, address: Address) -> MockContract {
        MockContract {
            address,
            ledger: self.ledger.clone(),
        }
    }
}

/// Initialize tracing for tests (idempotent).
fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init()
        .ok();
}

fn owned_ledger() -> Ledger {
    Ledger {
        owner: OWNER,
        ..Default::default()
    }
}

fn spec(title: &str, duration_seconds: u64) -> EventSpec {
    EventSpec::new(title, "desc", duration_seconds).unwrap()
}

fn three_events() -> Vec<EventSpec> {
    vec![
        spec("World Cup Winner", 7_776_000),
        spec("Bitcoin $100K", 5_184_000),
        spec("Gaming Championship", 2_592_000),
    ]
}

/// Report of an attached contract whose provisioning produced `summary`.
fn report_for(summary: ProvisionSummary, run_mode: RunMode) -> RunReport {
    RunReport::new(
        ContractVariant::PrivacyPredictionPlatform,
        run_mode,
        DeploymentResult {
            address: CONTRACT,
            owner_address: OWNER,
            initial_record_count: 0,
            deployed: false,
            transaction_hash: None,
        },
        OwnershipCheck::Verified { owner: OWNER },
        summary,
        None,
    )
}

fn plan(
    target: Target,
    ownership: OwnershipMode,
    run_mode: RunMode,
    events: Vec<EventSpec>,
) -> RunPlan {
    RunPlan {
        variant: ContractVariant::PrivacyPredictionPlatform,
        target,
        ownership,
        run_mode,
        catalog: Catalog::new(events).unwrap(),
        verify: true,
    }
}

#[tokio::test]
async fn test_fresh_deployment_creates_single_event() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        vec![spec("World Cup Winner", 7_776_000)],
    );

    let report = run(&factory, OWNER, &plan).await.unwrap();

    assert!(report.success);
    assert!(report.deployment.deployed);
    assert_eq!(report.deployment.address, CONTRACT);
    assert_eq!(report.deployment.initial_record_count, 0);
    assert_eq!(report.ownership, OwnershipCheck::Verified { owner: OWNER });
    assert_eq!(report.provision.outcomes.len(), 1);
    assert_eq!(report.provision.outcomes[0].status, ProvisionStatus::Succeeded);
    assert!(report.provision.outcomes[0].transaction_hash.is_some());
    assert_eq!(report.provision.records_after, Some(1));

    let verification = report.verification.unwrap();
    assert!(verification.is_complete());
    assert_eq!(verification.record_id, 0);
    assert_eq!(verification.round_is_active, Some(true));
    assert_eq!(verification.time_remaining_seconds, Some(7_776_000));
    assert_eq!(verification.total_predictions, Some(0));
    assert_eq!(verification.is_finalized, Some(false));
}

#[tokio::test]
async fn test_idempotent_mode_skips_populated_contract() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        events: three_events(),
        ..owned_ledger()
    });
    let plan = plan(
        Target::Attach(CONTRACT),
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let report = run(&factory, OWNER, &plan).await.unwrap();

    assert!(report.success);
    assert!(!report.deployment.deployed);
    assert_eq!(report.deployment.initial_record_count, 3);
    assert!(report.provision.skipped);
    assert!(report.provision.outcomes.is_empty());
    assert_eq!(factory.ledger().create_calls, 0);
    assert_eq!(factory.ledger().events.len(), 3);
    // Nothing created, so the smoke test falls back to record 0.
    assert_eq!(report.verification.unwrap().record_id, 0);
}

#[tokio::test]
async fn test_rejected_item_does_not_stop_the_batch() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        reject_calls: HashSet::from([1]),
        ..owned_ledger()
    });
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let report = run(&factory, OWNER, &plan).await.unwrap();

    let statuses: Vec<ProvisionStatus> =
        report.provision.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProvisionStatus::Succeeded,
            ProvisionStatus::Failed,
            ProvisionStatus::Succeeded
        ]
    );
    let indices: Vec<usize> = report.provision.outcomes.iter().map(|o| o.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    let failed = &report.provision.outcomes[1];
    assert_eq!(failed.spec.title, "Bitcoin $100K");
    assert!(failed.transaction_hash.is_none());
    assert!(
        failed
            .error_message
            .as_deref()
            .unwrap()
            .contains("replacement transaction underpriced")
    );

    assert!(report.success);
    assert_eq!(report.warnings().len(), 1);
    assert_eq!(report.provision.records_after, Some(2));
    assert_eq!(factory.ledger().create_calls, 3);
}

#[tokio::test]
async fn test_zero_duration_is_rejected_before_submission() {
    init_test_tracing();
    assert!(EventSpec::new("World Cup Winner", "desc", 0).is_err());

    let factory = MockFactory::new(owned_ledger());
    let contract = factory.attach(CONTRACT);
    let invalid = EventSpec {
        title: "World Cup Winner".to_string(),
        description: "desc".to_string(),
        duration_seconds: 0,
    };

    let summary = provision(&contract, &[invalid], RunMode::AlwaysCreate).await;

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].status, ProvisionStatus::Failed);
    assert!(
        summary.outcomes[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("zero duration")
    );
    assert_eq!(factory.ledger().create_calls, 0);
    assert_eq!(summary.records_after, Some(0));
}

#[tokio::test]
async fn test_invalid_catalog_is_refused_upfront() {
    init_test_tracing();
    let err = Catalog::new(vec![
        spec("ok", 10),
        EventSpec {
            title: "bad".to_string(),
            description: "desc".to_string(),
            duration_seconds: 0,
        },
    ])
    .unwrap_err();

    assert!(matches!(err, PreconditionError::InvalidCatalog { index: 1, .. }));
}

#[tokio::test]
async fn test_non_owner_never_reaches_provisioning() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::AlwaysCreate,
        three_events(),
    );

    let err = run(&factory, STRANGER, &plan).await.unwrap_err();

    match err {
        RunError::Precondition(PreconditionError::NotOwner(NotOwnerError { actual, expected })) => {
            assert_eq!(actual, STRANGER);
            assert_eq!(expected, OWNER);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(factory.ledger().create_calls, 0);
}

#[tokio::test]
async fn test_public_contract_accepts_any_signer() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Public,
        RunMode::AlwaysCreate,
        vec![spec("Test Event", 604_800)],
    );

    let report = run(&factory, STRANGER, &plan).await.unwrap();

    assert!(report.success);
    assert_eq!(report.ownership, OwnershipCheck::NotRequired);
    assert_eq!(report.provision.succeeded_count(), 1);
}

#[tokio::test]
async fn test_idempotent_rerun_creates_nothing() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let plan = plan(
        Target::Attach(CONTRACT),
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let first = run(&factory, OWNER, &plan).await.unwrap();
    assert_eq!(first.provision.succeeded_count(), 3);

    let second = run(&factory, OWNER, &plan).await.unwrap();
    assert_eq!(second.success, first.success);
    assert!(second.provision.outcomes.is_empty());
    assert_eq!(second.deployment.initial_record_count, 3);
    assert_eq!(factory.ledger().events.len(), 3);
}

#[tokio::test]
async fn test_always_create_rerun_duplicates_records() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let plan = plan(
        Target::Attach(CONTRACT),
        OwnershipMode::Required,
        RunMode::AlwaysCreate,
        three_events(),
    );

    run(&factory, OWNER, &plan).await.unwrap();
    let second = run(&factory, OWNER, &plan).await.unwrap();

    assert_eq!(second.provision.records_before, 3);
    assert_eq!(second.provision.records_after, Some(6));
    // The smoke test targets the first record of this run.
    assert_eq!(second.verification.unwrap().record_id, 3);
}

#[tokio::test]
async fn test_outcomes_match_catalog_regardless_of_failures() {
    init_test_tracing();
    for size in 1..=5usize {
        let failing: HashSet<usize> = (0..size).filter(|i| i % 2 == 0).collect();
        let factory = MockFactory::new(Ledger {
            reject_calls: failing.clone(),
            ..owned_ledger()
        });
        let events: Vec<EventSpec> = (0..size)
            .map(|i| spec(&format!("Event {}", i), 60))
            .collect();
        let plan = plan(
            Target::Deploy,
            OwnershipMode::Required,
            RunMode::AlwaysCreate,
            events,
        );

        let report = run(&factory, OWNER, &plan).await.unwrap();

        assert_eq!(report.provision.outcomes.len(), size);
        for (i, outcome) in report.provision.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.spec.title, format!("Event {}", i));
            assert_eq!(outcome.succeeded(), !failing.contains(&i));
        }
        assert!(report.success);
    }
}

#[tokio::test]
async fn test_reverted_and_unconfirmed_items_keep_their_hash() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        revert_calls: HashSet::from([0]),
        stall_calls: HashSet::from([1]),
        ..owned_ledger()
    });
    let contract = factory.attach(CONTRACT);

    let summary = provision(&contract, &three_events(), RunMode::AlwaysCreate).await;

    let [reverted, stalled, created] = summary.outcomes.as_slice() else {
        panic!("expected three outcomes");
    };
    assert_eq!(reverted.status, ProvisionStatus::Failed);
    assert!(reverted.transaction_hash.is_some());
    assert!(reverted.error_message.as_deref().unwrap().contains("reverted"));

    assert_eq!(stalled.status, ProvisionStatus::Failed);
    assert!(stalled.transaction_hash.is_some());
    assert!(stalled.error_message.as_deref().unwrap().contains("not confirmed"));

    assert!(created.succeeded());
    assert_eq!(summary.records_after, Some(1));
}

#[tokio::test]
async fn test_unreadable_count_skips_in_idempotent_mode() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        fail_count_query: true,
        ..owned_ledger()
    });
    let contract = factory.attach(CONTRACT);

    let summary = provision(&contract, &three_events(), RunMode::IdempotentSkip).await;

    assert!(summary.skipped);
    assert!(summary.outcomes.is_empty());
    assert!(!summary.already_populated());
    assert_eq!(summary.count_error.as_deref(), Some("connection refused"));
    assert_eq!(factory.ledger().create_calls, 0);

    let report = report_for(summary, RunMode::IdempotentSkip);
    let warnings = report.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("provisioning skipped"));
    assert!(warnings[0].contains("connection refused"));

    let text = report.to_string();
    assert!(text.contains("Record count unreadable, creation skipped"));
    assert!(!text.contains("Events already exist"));
}

#[tokio::test]
async fn test_unreadable_count_is_reported_in_always_create_mode() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        fail_count_query: true,
        ..owned_ledger()
    });
    let contract = factory.attach(CONTRACT);

    let summary = provision(&contract, &three_events(), RunMode::AlwaysCreate).await;

    assert!(!summary.skipped);
    assert_eq!(summary.records_before, 0);
    assert_eq!(summary.succeeded_count(), 3);
    assert!(summary.count_error.is_some());

    let report = report_for(summary, RunMode::AlwaysCreate);
    assert!(report.success);
    assert!(
        report
            .warnings()
            .iter()
            .any(|w| w.contains("initial record count unreadable (assumed 0)"))
    );
    let text = report.to_string();
    assert!(text.contains("Record count unreadable, assumed 0"));
    assert!(text.contains("created 3/3"));
}

#[tokio::test]
async fn test_rejected_deployment_is_fatal() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        reject_deploy: true,
        ..owned_ledger()
    });
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let err = run(&factory, OWNER, &plan).await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Deployment(DeploymentError::Rejected { .. })
    ));
    assert_eq!(factory.ledger().create_calls, 0);
}

#[tokio::test]
async fn test_reverted_deployment_is_fatal() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        revert_deploy: true,
        ..owned_ledger()
    });
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let err = run(&factory, OWNER, &plan).await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Deployment(DeploymentError::Reverted { .. })
    ));
}

#[tokio::test]
async fn test_failed_smoke_test_is_not_fatal() {
    init_test_tracing();
    let factory = MockFactory::new(Ledger {
        fail_queries: true,
        ..owned_ledger()
    });
    let plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );

    let report = run(&factory, OWNER, &plan).await.unwrap();

    assert!(report.success);
    let verification = report.verification.as_ref().unwrap();
    assert_eq!(verification.errors.len(), 3);
    assert_eq!(verification.round_id, None);
    assert_eq!(verification.total_predictions, None);
    assert_eq!(report.warnings().len(), 3);
}

#[tokio::test]
async fn test_smoke_test_can_be_disabled() {
    init_test_tracing();
    let factory = MockFactory::new(owned_ledger());
    let mut plan = plan(
        Target::Deploy,
        OwnershipMode::Required,
        RunMode::IdempotentSkip,
        three_events(),
    );
    plan.verify = false;

    let report = run(&factory, OWNER, &plan).await.unwrap();

    assert!(report.verification.is_none());
    assert_eq!(report.provision.succeeded_count(), 3);
}
