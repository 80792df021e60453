//! Stage 3: the order in which chapters are presented.

use crate::abstractions::Abstraction;
use crate::config::StageSettings;
use crate::contract::LlmClient;
use crate::prompts;
use crate::relationships::{abstraction_listing, RelationshipMap};
use crate::reply::{parse_index, parse_yaml_reply, ReplyError, StageError};
use crate::retry::run_with_retries;
use tracing::{debug, info};

fn ordering_context(abstractions: &[Abstraction], relationships: &RelationshipMap) -> String {
    let mut context = format!("Project Summary:\n{}\n\n", relationships.summary);
    context.push_str("Relationships (Indices refer to abstractions above):\n");
    for rel in &relationships.details {
        let from = abstractions.get(rel.from).map(|a| a.name.as_str()).unwrap_or("?");
        let to = abstractions.get(rel.to).map(|a| a.name.as_str()).unwrap_or("?");
        context.push_str(&format!(
            "- From {} ({from}) to {} ({to}): {}\n",
            rel.from, rel.to, rel.label
        ));
    }
    context
}

pub async fn order_chapters<L>(
    llm: &L,
    abstractions: &[Abstraction],
    relationships: &RelationshipMap,
    settings: &StageSettings,
) -> Result<Vec<usize>, StageError>
where
    L: LlmClient + ?Sized,
{
    let prompt = prompts::order_chapters(
        settings,
        &abstraction_listing(abstractions),
        &ordering_context(abstractions, relationships),
    );
    info!(abstractions = abstractions.len(), "Determining chapter order");

    let prompt = prompt.as_str();
    let count = abstractions.len();
    let order = run_with_retries(&settings.retry, "order_chapters", |attempt| async move {
        let reply = llm.complete(prompt, settings.use_cache && attempt == 0).await?;
        debug!(reply_len = reply.len(), "Received chapter order reply");
        Ok::<_, StageError>(parse_order(&reply, count)?)
    })
    .await?;

    info!(?order, "Determined chapter order");
    Ok(order)
}

/// Validate an ordering reply: a permutation of `0..abstraction_count`.
pub fn parse_order(reply: &str, abstraction_count: usize) -> Result<Vec<usize>, ReplyError> {
    let value = parse_yaml_reply(reply)?;
    let items = value
        .as_sequence()
        .ok_or_else(|| ReplyError::Shape("expected a YAML list of abstraction indices".into()))?;

    let mut seen = vec![false; abstraction_count];
    let mut order = Vec::with_capacity(abstraction_count);
    for item in items {
        let index = parse_index(item, abstraction_count)?;
        if seen[index] {
            return Err(ReplyError::Shape(format!("duplicate index {index} in chapter order")));
        }
        seen[index] = true;
        order.push(index);
    }
    let missing: Vec<usize> = (0..abstraction_count).filter(|i| !seen[*i]).collect();
    if !missing.is_empty() {
        return Err(ReplyError::Shape(format!(
            "chapter order is missing abstractions {missing:?}"
        )));
    }
    Ok(order)
}
