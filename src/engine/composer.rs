//! Message composition for one destination

use std::collections::BTreeMap;

use super::resolver::Metric;
use super::template::Template;
use crate::config::SlackWebhook;
use crate::message::{Block, NotificationMessage};

/// Build the message a destination receives for the active level
///
/// Output blocks are the template's base blocks, then its detail blocks if
/// the destination shows details for `color`, then its action blocks if it
/// shows actions for `color`. Markdown sections among the detail blocks are
/// rendered against `metrics` in name order; a block that fails to render
/// keeps its original text.
pub fn compose(
    template: &NotificationMessage,
    destination: &SlackWebhook,
    color: &str,
    metrics: &BTreeMap<String, Metric>,
) -> NotificationMessage {
    let mut blocks = template.blocks.clone();

    if destination.shows_details(color) {
        let ordered: Vec<Metric> = metrics.values().cloned().collect();
        blocks.extend(
            template
                .detail_blocks
                .iter()
                .map(|block| render_block(block, &ordered)),
        );
    }

    if destination.shows_actions(color) {
        blocks.extend(template.action_blocks.iter().cloned());
    }

    NotificationMessage::new(blocks)
}

fn render_block(block: &Block, metrics: &[Metric]) -> Block {
    let mut rendered = block.clone();
    if !block.is_templated() {
        return rendered;
    }

    if let Some(text) = rendered.text.as_mut() {
        match Template::parse(&text.text).and_then(|t| t.render(metrics)) {
            Ok(output) => text.text = output,
            Err(e) => {
                tracing::warn!(error = %e, "Keeping unrendered detail block");
            }
        }
    }

    rendered
}
