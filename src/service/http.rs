use std::sync::Arc;

use async_trait::async_trait;
use http::{header, Method, Response};
use log::{debug, warn};
use matchit::{Match, Router};
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};

use super::{metrics, status::HealthzHandler};
use crate::{
    config::Bridge,
    core::{BridgeError, ExecuteTemplateArgs, PluginResponse, ServiceRequest},
    orchestration::Dispatcher,
    utils::response::{is_json_content_type, CommonErrors, ResponseBuilder},
};

pub const TEMPLATE_EXECUTE_PATH: &str = "/api/v1/template.execute";
pub const HEALTHZ_PATH: &str = "/healthz";

const UNKNOWN_LABEL: &str = "unknown";
const REJECTED_PHASE: &str = "Rejected";

/// The parts of an HTTP request the handlers look at.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Handler {
    async fn handle(&self, request: &IncomingRequest) -> Response<Vec<u8>>;

    /// Whether the request body should be read before handling.
    fn wants_body(&self, _method: &Method, _content_type: Option<&str>) -> bool {
        false
    }
}

/// Executor plugin endpoint of the orchestration engine.
pub struct TemplateExecuteHandler {
    dispatcher: Arc<Dispatcher>,
    plugin_key: String,
}

impl TemplateExecuteHandler {
    pub fn new(dispatcher: Arc<Dispatcher>, plugin_key: String) -> Self {
        Self {
            dispatcher,
            plugin_key,
        }
    }

    async fn plugin_response(
        &self,
        request: &IncomingRequest,
    ) -> (Option<ServiceRequest>, PluginResponse) {
        if request.method != Method::POST {
            return (
                None,
                PluginResponse::rejected(BridgeError::Request("method is not POST".to_string())),
            );
        }

        if !is_json_content_type(request.content_type.as_deref()) {
            return (
                None,
                PluginResponse::rejected(BridgeError::Request(
                    "content type header value is unsupported".to_string(),
                )),
            );
        }

        let args = match ExecuteTemplateArgs::from_slice(&request.body) {
            Ok(args) => args,
            Err(e) => return (None, PluginResponse::rejected(e)),
        };

        let workflow_id = match args.workflow_meta() {
            Some(meta) => {
                debug!(
                    "Received template.execute for workflow {}/{} ({})",
                    meta.namespace, meta.name, meta.uid
                );
                meta.uid.clone()
            }
            None => String::new(),
        };

        let input = match args.plugin_input(&self.plugin_key) {
            Ok(input) => input,
            Err(e) => return (None, PluginResponse::rejected(e)),
        };

        let service_request = match input.resolve() {
            Ok(service_request) => service_request,
            Err(e) => {
                warn!("Invalid plugin input for workflow {}: {}", workflow_id, e);
                return (None, PluginResponse::failed(e));
            }
        };

        debug!(
            "Plugin input: action={} service={} resource_arn={}",
            service_request.action, service_request.service, service_request.resource_arn
        );
        let response = self.dispatcher.dispatch(&workflow_id, &service_request).await;
        (Some(service_request), response)
    }
}

#[async_trait]
impl Handler for TemplateExecuteHandler {
    async fn handle(&self, request: &IncomingRequest) -> Response<Vec<u8>> {
        let (service_request, response) = self.plugin_response(request).await;
        let (service, action) = match &service_request {
            Some(r) => (r.service.as_str(), r.action.as_str()),
            None => (UNKNOWN_LABEL, UNKNOWN_LABEL),
        };

        match response.into_reply(self.dispatcher.requeue().poll) {
            Ok(reply) => {
                metrics::record_request(service, action, reply.node.phase.as_str());
                ResponseBuilder::success_json(&reply)
            }
            Err(e) => {
                warn!("Rejected template.execute request: {}", e);
                metrics::record_request(service, action, REJECTED_PHASE);
                CommonErrors::bad_request()
            }
        }
    }

    fn wants_body(&self, method: &Method, content_type: Option<&str>) -> bool {
        *method == Method::POST && is_json_content_type(content_type)
    }
}

pub struct BridgeHttpApp {
    router: Router<Box<dyn Handler + Send + Sync>>,
}

impl BridgeHttpApp {
    pub fn new(dispatcher: Arc<Dispatcher>, config: &Bridge) -> Self {
        let mut this = Self {
            router: Router::new(),
        };

        this.route(
            TEMPLATE_EXECUTE_PATH,
            Box::new(TemplateExecuteHandler::new(
                dispatcher,
                config.plugin_key.clone(),
            )),
        )
        .route(HEALTHZ_PATH, Box::new(HealthzHandler));

        this
    }

    fn route(&mut self, path: &str, handler: Box<dyn Handler + Send + Sync>) -> &mut Self {
        if let Err(e) = self.router.insert(path, handler) {
            log::error!("Failed to register route {}: {}", path, e);
        }
        self
    }

    pub fn bridge_http_service(dispatcher: Arc<Dispatcher>, config: &Bridge) -> Service<Self> {
        let app = Self::new(dispatcher, config);
        let mut service = Service::new("Plugin HTTP".to_string(), app);
        service.add_tcp(&config.address.to_string());
        service
    }

    /// Route an already read request.
    pub async fn serve(&self, path: &str, request: &IncomingRequest) -> Response<Vec<u8>> {
        match self.router.at(path) {
            Ok(Match { value, .. }) => value.handle(request).await,
            Err(_) => CommonErrors::not_found(),
        }
    }
}

#[async_trait]
impl ServeHttp for BridgeHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        let (path, method, content_type) = {
            let req_header = http_session.req_header();
            (
                req_header.uri.path().to_string(),
                req_header.method.clone(),
                req_header
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string()),
            )
        };

        let handler = match self.router.at(&path) {
            Ok(Match { value, .. }) => value,
            Err(_) => return CommonErrors::not_found(),
        };

        let mut body = Vec::new();
        if handler.wants_body(&method, content_type.as_deref()) {
            match read_request_body(http_session).await {
                Ok(data) => body = data,
                Err(e) => {
                    warn!("Failed to read request body: {}", e);
                    return CommonErrors::bad_request();
                }
            }
        }

        handler
            .handle(&IncomingRequest {
                method,
                content_type,
                body,
            })
            .await
    }
}

async fn read_request_body(http_session: &mut ServerSession) -> pingora_error::Result<Vec<u8>> {
    let mut body_data = Vec::new();
    while let Some(bytes) = http_session.read_request_body().await? {
        body_data.extend_from_slice(&bytes);
    }
    Ok(body_data)
}
