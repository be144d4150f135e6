use customer_api_core::CustomerService;
use customer_api_db::{
    connect_with_config, migrations, DemoDataset, SqlCustomerRepository, VerificationResult,
};

use crate::commands::{
    build_runtime, load_config, CommandResult, StepError, EXIT_CONNECTIVITY, EXIT_MIGRATION,
    EXIT_SEED,
};

const COMMAND: &str = "seed";

pub fn run() -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_CONNECTIVITY))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let service = CustomerService::new(SqlCustomerRepository::new(pool));
        let outcome = seed_and_verify(&service).await;
        service.close().await;
        outcome
    });

    match result {
        Ok(message) => CommandResult::success(COMMAND, message),
        Err(step) => CommandResult::from_step(COMMAND, step),
    }
}

async fn seed_and_verify(
    service: &CustomerService<SqlCustomerRepository>,
) -> Result<String, StepError> {
    let seeded = DemoDataset::load(service)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED))?;
    let verification = DemoDataset::verify(service)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED))?;

    if !verification.all_present {
        return Err(("seed_verification", verification_failure_message(&verification), EXIT_SEED));
    }

    let added = seeded
        .inserted
        .iter()
        .map(|customer| {
            format!("  - {} {} (id {})", customer.first_name, customer.last_name, customer.id)
        })
        .collect::<Vec<_>>();
    let mut message = format!(
        "demo customers ready: {} added, {} already present",
        seeded.inserted.len(),
        seeded.already_present
    );
    if !added.is_empty() {
        message.push('\n');
        message.push_str(&added.join("\n"));
    }
    Ok(message)
}

fn verification_failure_message(verification: &VerificationResult) -> String {
    let missing = verification
        .checks
        .iter()
        .filter_map(|(name, present)| (!present).then_some(name.as_str()))
        .collect::<Vec<_>>();

    if missing.is_empty() {
        "some demo customers failed to load".to_string()
    } else {
        format!("demo customers missing after seed: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use customer_api_db::VerificationResult;

    use super::verification_failure_message;

    #[test]
    fn verification_message_names_missing_customers() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![("jane dow".to_string(), true), ("john dow".to_string(), false)],
        };

        assert_eq!(
            verification_failure_message(&verification),
            "demo customers missing after seed: john dow"
        );
    }

    #[test]
    fn verification_message_falls_back_without_labels() {
        let verification = VerificationResult { all_present: false, checks: Vec::new() };

        assert_eq!(
            verification_failure_message(&verification),
            "some demo customers failed to load"
        );
    }
}
