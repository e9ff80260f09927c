use std::sync::Arc;

use pingora::services::{background::background_service, listening::Service};
use pingora_core::server::{configuration::Opt, Server};

use argo_aws_plugin::{
    backend::Backends,
    config::{Bridge, Config},
    core::ExecutionTracker,
    logging::{self, Logger},
    orchestration::{Dispatcher, RequeuePolicy, TrackerJanitor},
    service::BridgeHttpApp,
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
    let level = logging::level_filter(config.bridge.debug);
    let logger = if let Some(log_cfg) = &config.bridge.log {
        let logger = Logger::new(log_cfg.clone());
        logger.init_env_logger(level);
        Some(logger)
    } else {
        logging::init_stderr_logger(level);
        None
    };

    log::info!(
        "Configuring plugin {} on {}, log level {}",
        config.bridge.plugin_key,
        config.bridge.address,
        level
    );

    // Build service clients, tracker and dispatcher
    log::info!("Loading backends...");
    let backends = match Backends::from_config(&config.backends, &config.bridge.tracker) {
        Ok(backends) => backends,
        Err(e) => {
            eprintln!("Failed to load backends: {e}");
            std::process::exit(1);
        }
    };
    let tracker = Arc::new(ExecutionTracker::new());
    let dispatcher = Arc::new(Dispatcher::new(
        backends,
        tracker.clone(),
        RequeuePolicy::from(&config.bridge.requeue),
    ));

    // Create server instance
    let mut plugin_server = Server::new_with_opt_and_conf(Some(cli_options), config.pingora);

    // Add log service
    if let Some(log_service) = logger {
        log::info!("Adding log sync service...");
        plugin_server.add_service(log_service);
    }

    log::info!("Adding tracker janitor...");
    plugin_server.add_service(background_service(
        "tracker janitor",
        TrackerJanitor::new(tracker, &config.bridge.tracker),
    ));

    add_optional_services(&mut plugin_server, &config.bridge);

    log::info!("Adding listeners...");
    let http_service = BridgeHttpApp::bridge_http_service(dispatcher, &config.bridge);

    // Start server
    log::info!("Bootstrapping...");
    plugin_server.bootstrap();
    log::info!("Bootstrapped. Adding Services...");
    plugin_server.add_service(http_service);

    log::info!("Starting Server...");
    plugin_server.run_forever();
}

fn add_optional_services(server: &mut Server, cfg: &Bridge) {
    if let Some(prometheus_cfg) = &cfg.prometheus {
        log::info!("Adding Prometheus HTTP...");
        let mut prometheus_service_http = Service::prometheus_http_service();
        prometheus_service_http.add_tcp(&prometheus_cfg.address.to_string());
        server.add_service(prometheus_service_http);
    }
}
