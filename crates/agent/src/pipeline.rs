// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task pipeline: one delivered job in, exactly one result envelope
//! out, with at most one external script invocation in between.

use std::sync::Arc;

use async_trait::async_trait;
use hvx_actions::{interpret, ActionOutput, ActionRunner};
use hvx_broker::{result_key, DeliveryHandler, Disposition, PublishOpts, Publisher, EXCHANGE_RESULTS};
use hvx_core::{RuntimeContext, Task, TaskResult};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::telemetry::Telemetry;

/// Converts deliveries into result envelopes.
pub struct TaskPipeline<P, R> {
    context: Arc<RuntimeContext>,
    publisher: Arc<P>,
    runner: Arc<R>,
    telemetry: Arc<Telemetry<P, R>>,
}

impl<P, R> TaskPipeline<P, R>
where
    P: Publisher + 'static,
    R: ActionRunner + 'static,
{
    pub fn new(
        context: Arc<RuntimeContext>,
        publisher: Arc<P>,
        runner: Arc<R>,
        telemetry: Arc<Telemetry<P, R>>,
    ) -> Self {
        Self {
            context,
            publisher,
            runner,
            telemetry,
        }
    }

    async fn execute(&self, task: &Task) -> ActionOutput {
        let payload = merged_payload(&task.data, &self.context);
        match self.runner.run(&task.action, &payload).await {
            Ok(output) => output,
            // The script never ran (missing interpreter/script, spawn
            // failure); publish that as a handler failure.
            Err(e) => ActionOutput::failed("", e.to_string()),
        }
    }

    async fn publish_result(&self, task: &Task, envelope: &TaskResult) {
        let body = match serde_json::to_vec(envelope) {
            Ok(body) => body,
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "result envelope encode failed");
                return;
            }
        };
        let opts = PublishOpts::correlated(task.effective_correlation_id());

        if let Err(e) = self
            .publisher
            .publish(
                EXCHANGE_RESULTS,
                &result_key(task.task_id.as_str()),
                body.clone(),
                opts.clone(),
            )
            .await
        {
            warn!(task_id = %task.task_id, error = %e, "result publish failed");
        }

        // Private reply convention: also deliver to the requested queue.
        if let Some(reply_to) = &task.reply_to {
            if let Err(e) = self.publisher.publish_to_queue(reply_to, body, opts).await {
                warn!(task_id = %task.task_id, reply_to = %reply_to, error = %e, "reply publish failed");
            }
        }
    }
}

#[async_trait]
impl<P, R> DeliveryHandler for TaskPipeline<P, R>
where
    P: Publisher + 'static,
    R: ActionRunner + 'static,
{
    async fn on_delivery(&self, body: &[u8]) -> Disposition {
        let task = match Task::decode(body) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "poison message rejected");
                return Disposition::Drop;
            }
        };

        if !task.targets(self.context.agent_id.as_str()) {
            debug!(
                task_id = %task.task_id,
                target = %task.agent_id,
                "misrouted task acknowledged and dropped"
            );
            return Disposition::Ack;
        }

        info!(
            task_id = %task.task_id,
            action = %task.action,
            attempt = task.attempt,
            "task received"
        );

        let output = self.execute(&task).await;
        let outcome = interpret(&output);
        let envelope = TaskResult::new(
            task.task_id.clone(),
            self.context.agent_id.clone(),
            outcome.ok,
            outcome.result,
            outcome.error,
        );

        info!(task_id = %task.task_id, ok = envelope.ok, "task finished");
        self.publish_result(&task, &envelope).await;

        // Post-task hook on its own worker; it must never block the
        // consume loop.
        let telemetry = Arc::clone(&self.telemetry);
        tokio::spawn(async move {
            telemetry.light_refresh().await;
        });

        if envelope.ok {
            Disposition::Ack
        } else {
            Disposition::Drop
        }
    }
}

/// `task.data` merged with the runtime context under `__ctx`.
///
/// Non-object data cannot carry the context key; it is replaced by a
/// bare `{__ctx}` object (the scripts treat parameters as a mapping).
pub fn merged_payload(data: &Value, context: &RuntimeContext) -> Value {
    let mut map = match data {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            debug!(kind = %value_kind(other), "non-object task data ignored");
            Map::new()
        }
    };
    map.insert("__ctx".to_string(), context.ctx_value());
    Value::Object(map)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
