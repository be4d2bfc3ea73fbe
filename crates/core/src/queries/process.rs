//! Response mapping: `Sent -> Completed`

use odatalink_domain::{HttpResponse, ObjectRef, Result, Value};
use serde_json::Value as Json;
use tracing::debug;

use super::{ClientQuery, QueryKind, ReturnTarget};
use crate::context::ClientContext;

impl ClientQuery {
    /// Map a 2xx response back onto the proxy graph.
    pub(crate) fn process_response(
        &self,
        ctx: &mut ClientContext,
        response: &HttpResponse,
    ) -> Result<()> {
        let format = *ctx.json_format();
        let payload = response.json()?.map(|json| format.unwrap_payload(json));

        match &self.kind {
            QueryKind::Read { next_url, follow_next, select, expand } => {
                let payload = payload.unwrap_or(Json::Null);
                match self.target() {
                    ReturnTarget::Object(ObjectRef::Collection(id)) => {
                        ctx.map_collection_json(id, &payload, next_url.is_some())?;
                        ctx.notify_page_loaded(id)?;
                        if *follow_next {
                            if let Some(link) = ctx.collection(id)?.next_link().map(str::to_string) {
                                debug!(query = %self.id, next = %link, "queueing next page");
                                let follow_up = ClientQuery::new(
                                    id,
                                    QueryKind::Read {
                                        select: select.clone(),
                                        expand: expand.clone(),
                                        next_url: Some(link),
                                        follow_next: true,
                                    },
                                );
                                ctx.add_query(follow_up);
                            }
                        }
                    }
                    ReturnTarget::Object(ObjectRef::Entity(id)) => ctx.map_entity_json(id, &payload)?,
                    ReturnTarget::Result(id) => ctx.set_result(id, Value::from_json(payload))?,
                }
            }
            QueryKind::Create(_) | QueryKind::Update => {
                if let ReturnTarget::Object(ObjectRef::Entity(id)) = self.target() {
                    if let Some(payload) = &payload {
                        ctx.map_entity_json(id, payload)?;
                    }
                    ctx.clear_changes(id)?;
                }
            }
            QueryKind::Delete => {
                if let ObjectRef::Entity(id) = self.binding {
                    ctx.remove_from_parent_collection(id)?;
                }
            }
            QueryKind::ServiceOperation(op) => {
                let Some(payload) = payload else {
                    return Ok(());
                };
                match self.return_target {
                    Some(ReturnTarget::Object(ObjectRef::Entity(id))) => {
                        ctx.map_entity_json(id, &payload)?;
                    }
                    Some(ReturnTarget::Object(ObjectRef::Collection(id))) => {
                        ctx.map_collection_json(id, &payload, false)?;
                    }
                    Some(ReturnTarget::Result(id)) => {
                        let scalar = format.unwrap_scalar(payload, &op.name);
                        ctx.set_result(id, Value::from_json(scalar))?;
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}
