#![allow(clippy::upper_case_acronyms)]

use std::sync::Arc;

use pingora::services::listening::Service;
use pingora_core::{
    server::{configuration::Opt, Server},
    services::background::background_service,
};

use pinglegacy::{
    config::Config,
    core::{loader::MappingLoader, registry::PoolRegistry, status},
    fetch::HttpFetcher,
    logging::Logger,
    orchestration::{LegacyOrchestrator, MappingReloader},
    service::{LegacyHttpApp, StatusHttpApp},
};

fn main() {
    // Load configuration and command-line arguments
    let cli_options = Opt::parse_args();
    let config = match Config::load_yaml_with_opt_override(&cli_options) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let logger = if let Some(log_cfg) = &config.log {
        let logger = Logger::new(log_cfg.clone());
        logger.init_env_logger();
        Some(logger)
    } else {
        env_logger::init();
        None
    };

    log::info!("Loading legacy mappings...");
    let mappings = match MappingLoader::load(&config) {
        Ok(mappings) => mappings,
        Err(e) => {
            eprintln!("Error loading legacy mappings: {e}");
            std::process::exit(1);
        }
    };
    let mapping_count = mappings.len();

    let fetcher = match HttpFetcher::new(&config.fetch) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("Error building HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(PoolRegistry::new());
    let orchestrator = Arc::new(LegacyOrchestrator::new(
        mappings,
        registry.clone(),
        Arc::new(fetcher),
    ));

    let conf_path = cli_options.conf.clone().unwrap_or_default();
    let mut server = Server::new_with_opt_and_conf(Some(cli_options), config.pingora);

    if let Some(log_service) = logger {
        log::info!("Adding log sync service...");
        server.add_service(log_service);
    }

    if let Some(reload_cfg) = &config.reload {
        log::info!("Adding mapping reload service...");
        let reloader = MappingReloader::new(&conf_path, reload_cfg, orchestrator.clone());
        server.add_service(background_service("mapping reload", reloader));
    }

    log::info!("Adding listeners...");
    let legacy_service = match LegacyHttpApp::legacy_http_service(orchestrator, &config.listeners) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to add listeners: {e}");
            std::process::exit(1);
        }
    };

    if let Some(status_cfg) = &config.status {
        log::info!("Adding Status HTTP...");
        server.add_service(StatusHttpApp::status_http_service(status_cfg, registry));
    }

    if let Some(prometheus_cfg) = &config.prometheus {
        log::info!("Adding Prometheus HTTP...");
        let mut prometheus_service_http = Service::prometheus_http_service();
        prometheus_service_http.add_tcp(&prometheus_cfg.address.to_string());
        server.add_service(prometheus_service_http);
    }

    log::info!("Bootstrapping...");
    server.bootstrap();
    status::mark_ready(mapping_count);

    log::info!("Bootstrapped. Adding Services...");
    server.add_service(legacy_service);

    log::info!("Starting Server...");
    server.run_forever();
}
