use crate::deploy::ExecutionReport;
use crate::runtime::RuntimeRegistry;
use crate::types::Command;

/// Print the compiled-in runtimes with their service and resource loaders.
pub fn print_providers(registry: &RuntimeRegistry) {
    println!("🔌 Runtimes ({}):", registry.runtimes().len());
    if registry.is_empty() {
        println!("  none compiled in; provider crates register theirs via cli::run");
        return;
    }
    for runtime in registry.runtimes() {
        println!("  • {}", runtime.name());
        let services: Vec<_> = runtime
            .service_loaders()
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        let resources: Vec<_> = runtime
            .resource_loaders()
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        println!("      services:  {}", services.join(", "));
        println!("      resources: {}", resources.join(", "));
    }
}

pub fn print_execution_report(command: Command, env: &str, report: &ExecutionReport) {
    println!("🚀 {command} for environment {env}");
    println!("  Runtimes:   {}", report.runtimes.join(", "));
    println!("  Resources:  {}", report.resources);
    if command == Command::Apply {
        println!("  Migrations: {}", report.migrations);
    }
    println!("✅ Done");
}

/// Secret names with the identities each one is readable by.
pub fn print_secret_names(env: &str, secrets: &[(String, Vec<String>)]) {
    println!("🔐 Secrets of {env} ({}):", secrets.len());
    for (name, readers) in secrets {
        println!("  • {name}");
        println!("      readable by: {}", readers.join(", "));
    }
}
