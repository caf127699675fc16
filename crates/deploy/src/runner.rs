//! Run execution engine: deploy -> ownership -> provision -> verify -> report.

use alloy_core::primitives::Address;

use crate::{
    ContractArtifact, RunConfig, RunReport,
    config::{RunPlan, Target},
    contract::{ArtifactFactory, ContractFactory, RpcClient},
    deployer, ownership, provisioner, verifier,
    error::RunError,
};

/// Everything a stage may touch once the contract is bound.
///
/// Passed explicitly to every stage; there is no global signer or handle.
pub struct RunContext<'a, C> {
    pub signer: Address,
    pub contract: &'a C,
}

/// Execute a resolved plan against `factory` on behalf of `signer`.
///
/// Only deployment and ownership failures abort the run. Item and smoke-test
/// failures end up in the returned report.
pub async fn run<F: ContractFactory>(
    factory: &F,
    signer: Address,
    plan: &RunPlan,
) -> Result<RunReport, RunError> {
    // Stage 1: deploy or attach
    let (contract, deployment) = match plan.target {
        Target::Deploy => {
            tracing::info!(variant = %plan.variant, "Deploying prediction contract...");
            deployer::deploy_contract(factory).await?
        }
        Target::Attach(address) => deployer::attach_contract(factory, address).await?,
    };

    let ctx = RunContext {
        signer,
        contract: &contract,
    };

    // Stage 2: ownership gate
    let ownership = ownership::check_ownership(ctx.signer, deployment.owner_address, plan.ownership)?;

    // Stage 3: provisioning
    let provision = provisioner::provision(ctx.contract, &plan.catalog, plan.run_mode).await;

    // Stage 4: smoke test
    let verification = if plan.verify {
        let record_id = verifier::target_record(&provision);
        Some(verifier::verify(ctx.contract, record_id).await)
    } else {
        tracing::info!("Post-deployment checks disabled");
        None
    };

    // Stage 5: report
    let report = RunReport::new(
        plan.variant,
        plan.run_mode,
        deployment,
        ownership,
        provision,
        verification,
    );

    tracing::info!(
        success = report.success,
        warnings = report.warnings().len(),
        "Run complete"
    );

    Ok(report)
}

/// Resolve `config` against a JSON-RPC node and execute it.
pub async fn execute(config: &RunConfig) -> Result<RunReport, RunError> {
    let plan = config.plan()?;

    let signer = match config.signer_address()? {
        Some(signer) => signer,
        None => RpcClient::default_account(&config.rpc_url).await?,
    };

    tracing::info!(
        rpc_url = %config.rpc_url,
        signer = %signer,
        variant = %plan.variant,
        run_mode = %plan.run_mode,
        ownership = %plan.ownership,
        events = plan.catalog.len(),
        "Starting provisioning run..."
    );

    let client = RpcClient::new(
        config.rpc_url.clone(),
        signer,
        config.confirmation_timeout(),
        config.poll_interval(),
    )?;

    let factory = match plan.target {
        Target::Deploy => {
            let artifact =
                ContractArtifact::load(&config.artifact_path(), plan.variant.contract_name())?;
            ArtifactFactory::new(client, artifact)
        }
        Target::Attach(_) => ArtifactFactory::attach_only(client),
    };

    let report = run(&factory, signer, &plan).await?;

    if let Some(ref path) = config.report_path {
        report.save_to_file(path)?;
    }

    Ok(report)
}
