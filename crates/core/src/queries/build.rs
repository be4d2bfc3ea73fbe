//! Request rendering: `Queued -> Built`

use odatalink_domain::constants::{HEADER_ACCEPT, HEADER_CONTENT_TYPE};
use odatalink_domain::{
    ClientError, EntityId, HttpMethod, ObjectRef, QueryOptions, RequestOptions, Result,
};
use serde_json::{Map, Value as Json};
use url::Url;

use super::{ClientQuery, CreatePayload, QueryKind, ReturnTarget, ServiceOperation};
use crate::context::ClientContext;
use crate::objects::JsonScope;
use crate::paths::{PathSegment, ResourcePath};

impl ClientQuery {
    /// Render method, URL, headers and body against the current graph.
    pub(crate) fn build_request(&self, ctx: &ClientContext) -> Result<RequestOptions> {
        let format = ctx.json_format();
        let mut request = match &self.kind {
            QueryKind::Read { select, expand, next_url, .. } => match next_url {
                Some(next) => RequestOptions::new(HttpMethod::Get, resolve_link(ctx, next)?),
                None => {
                    let mut options = binding_options(ctx, self.binding)?;
                    options.include(select, expand);
                    let url = binding_url(ctx, self.binding, false)?;
                    RequestOptions::new(HttpMethod::Get, options.apply_to(&url))
                }
            },
            QueryKind::Create(payload) => {
                let body = match payload {
                    CreatePayload::Json(json) => json.clone(),
                    CreatePayload::Target => match self.return_target {
                        Some(ReturnTarget::Object(ObjectRef::Entity(id))) => {
                            annotate(ctx, id, ctx.entity_to_json(id, JsonScope::All)?)?
                        }
                        _ => {
                            return Err(ClientError::invalid_input(
                                "create query needs an entity return target",
                            ))
                        }
                    },
                };
                RequestOptions::json(HttpMethod::Post, binding_url(ctx, self.binding, true)?, &body)
            }
            QueryKind::Update => {
                let id = self.entity_binding()?;
                let body = annotate(ctx, id, ctx.entity_to_json(id, JsonScope::Changed)?)?;
                RequestOptions::json(HttpMethod::Patch, binding_url(ctx, self.binding, false)?, &body)
            }
            QueryKind::Delete => {
                self.entity_binding()?;
                RequestOptions::new(HttpMethod::Delete, binding_url(ctx, self.binding, false)?)
            }
            QueryKind::ServiceOperation(op) => self.build_operation(ctx, op)?,
        };

        request.set_header(HEADER_ACCEPT, format.accept_header());
        if request.body.is_some() {
            request.set_header(HEADER_CONTENT_TYPE, format.content_type());
        }
        Ok(request)
    }

    fn build_operation(&self, ctx: &ClientContext, op: &ServiceOperation) -> Result<RequestOptions> {
        let url = if self.is_static {
            let type_name = ctx.type_name_of(self.binding)?;
            ResourcePath::service_operation(
                format!("{type_name}.{}", op.name),
                op.url_params.clone(),
                None,
            )
            .absolute(ctx.service_root())
        } else {
            let parent = resolved_path(ctx, self.binding, false)?;
            ResourcePath::service_operation(op.name.clone(), op.url_params.clone(), Some(&parent))
                .absolute(ctx.service_root())
        };

        let body = op.body.clone().map(|body| match &op.payload_key {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), body);
                Json::Object(wrapped)
            }
            None => body,
        });
        Ok(match body {
            Some(body) => RequestOptions::json(op.method, url, &body),
            None => RequestOptions::new(op.method, url),
        })
    }

    fn entity_binding(&self) -> Result<EntityId> {
        match self.binding {
            ObjectRef::Entity(id) => Ok(id),
            ObjectRef::Collection(_) => Err(ClientError::invalid_input(format!(
                "{} query must be bound to an entity",
                self.kind.name()
            ))),
        }
    }
}

/// Path of the binding target. A create may post through an entity
/// whose own item is still unresolved; everything else needs a fully
/// resolved chain.
fn resolved_path(ctx: &ClientContext, target: ObjectRef, for_create: bool) -> Result<ResourcePath> {
    let path = match target {
        ObjectRef::Entity(id) => ctx.entity(id)?.resource_path().cloned(),
        ObjectRef::Collection(id) => ctx.collection(id)?.resource_path().cloned(),
    }
    .ok_or_else(|| ClientError::addressing(format!("{target} has no resource path")))?;

    let pending_item = matches!(path.segment(), PathSegment::Item { key: None, .. });
    let addressable = if for_create && pending_item {
        path.parent().map_or(true, ResourcePath::is_resolved)
    } else {
        path.is_resolved()
    };
    if !addressable {
        return Err(ClientError::addressing(format!("{target} is not resolved yet: {path}")));
    }
    Ok(path)
}

fn binding_url(ctx: &ClientContext, target: ObjectRef, for_create: bool) -> Result<String> {
    Ok(resolved_path(ctx, target, for_create)?.absolute(ctx.service_root()))
}

fn binding_options(ctx: &ClientContext, target: ObjectRef) -> Result<QueryOptions> {
    Ok(match target {
        ObjectRef::Entity(id) => ctx.entity(id)?.query_options().clone(),
        ObjectRef::Collection(id) => ctx.collection(id)?.query_options().clone(),
    })
}

/// Continuation links may be absolute or relative to the service root.
fn resolve_link(ctx: &ClientContext, link: &str) -> Result<String> {
    if link.starts_with("https://") || link.starts_with("http://") {
        return Ok(link.to_string());
    }
    let root = Url::parse(ctx.service_root())
        .map_err(|e| ClientError::addressing(format!("invalid service root: {e}")))?;
    root.join(link.trim_start_matches('/'))
        .map(String::from)
        .map_err(|e| ClientError::addressing(format!("invalid next link '{link}': {e}")))
}

/// Verbose payloads carry the entity type under `__metadata`.
fn annotate(ctx: &ClientContext, id: EntityId, body: Json) -> Result<Json> {
    let type_name = ctx.entity(id)?.entity_type_name().to_string();
    Ok(match (ctx.json_format().type_annotation(&type_name), body) {
        (Some((key, meta)), Json::Object(map)) => {
            let mut annotated = Map::new();
            annotated.insert(key, meta);
            annotated.extend(map);
            Json::Object(annotated)
        }
        (_, body) => body,
    })
}
