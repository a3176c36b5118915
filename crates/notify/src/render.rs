//! Classified batch → [`Notification`].
//!
//! Message building is a fixed header/body/footer sequence, so it is one pure
//! function over the batch, the rule's query and its render options.

use serde::{Deserialize, Serialize};

use spot_core::{Classification, Classified, InstancePrice, ResourceQuery};

use crate::templating::TemplateRenderer;
use crate::traits::{MessageFormat, Notification, NotifyError};

const QUERY_COLOR: &str = "#1E90FF";
const MONITOR_COLOR: &str = "#33CCFF";
const ALARM_COLOR: &str = "#B22222";
const RECOVER_COLOR: &str = "#228B22";
const HIGHLIGHT_COLOR: &str = "#DC143C";
const FOOTER_COLOR: &str = "#A9A9A9";
const PRICE_DECIMALS: usize = 5;

/// Per-rule presentation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub format: MessageFormat,
    /// Highlight above-threshold instance types.
    pub color: bool,
    /// Minijinja template replacing the built-in table body.
    pub template: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: MessageFormat::Markdown,
            color: true,
            template: None,
        }
    }
}

/// Everything about the rule that the message mentions.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub rule_id: &'a str,
    pub rule_name: &'a str,
    pub query: &'a ResourceQuery,
    pub options: &'a RenderOptions,
}

/// Data exposed to custom body templates.
#[derive(Serialize)]
struct TemplateData<'a> {
    rule: TemplateRule<'a>,
    classification: Classification,
    threshold: Option<f64>,
    judged_by: &'static str,
    items: &'a [InstancePrice],
    above: &'a [InstancePrice],
    below: &'a [InstancePrice],
    query: &'a ResourceQuery,
    now: String,
}

#[derive(Serialize)]
struct TemplateRule<'a> {
    id: &'a str,
    name: &'a str,
}

/// `ecs.c5.xlarge` → `c5.xlarge`.
pub fn short_instance_type(instance_type_id: &str) -> &str {
    instance_type_id.strip_prefix("ecs.").unwrap_or(instance_type_id)
}

/// Drop the `{region}-` prefix from a zone id.
pub fn short_zone<'a>(zone_id: &'a str, region: &str) -> &'a str {
    zone_id
        .strip_prefix(region)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(zone_id)
}

fn title(class: Classification) -> &'static str {
    match class {
        Classification::OnceQuery => "Query Result",
        Classification::Alarm => "Threshold Exceeded",
        Classification::Recover => "Recovered",
        Classification::Monitor => "Monitor",
    }
}

fn title_color(class: Classification) -> &'static str {
    match class {
        Classification::OnceQuery => QUERY_COLOR,
        Classification::Alarm => ALARM_COLOR,
        Classification::Recover => RECOVER_COLOR,
        Classification::Monitor => MONITOR_COLOR,
    }
}

fn footer_text(classified: &Classified, query: &ResourceQuery) -> String {
    match (classified.classification, classified.threshold) {
        (Classification::OnceQuery, _) | (_, None) => format!("conditions: {}", query.conditions()),
        (_, Some(threshold)) => format!(
            "threshold: {} ({}); conditions: {}",
            threshold,
            classified.judged_by,
            query.conditions()
        ),
    }
}

/// Rows in display order and whether each is highlighted.
///
/// Monitor lists the below-threshold rows first, then the above-threshold
/// ones; Alarm highlights everything when coloring is on.
fn display_rows<'a>(classified: &'a Classified, color: bool) -> Vec<(&'a InstancePrice, bool)> {
    match classified.classification {
        Classification::Monitor => classified
            .below
            .iter()
            .map(|p| (p, false))
            .chain(classified.above.iter().map(|p| (p, color)))
            .collect(),
        Classification::Alarm => classified.items.iter().map(|p| (p, color)).collect(),
        Classification::Recover | Classification::OnceQuery => {
            classified.items.iter().map(|p| (p, false)).collect()
        }
    }
}

fn cells(price: &InstancePrice, region: &str) -> [String; 4] {
    [
        short_instance_type(&price.instance_type_id).to_string(),
        short_zone(&price.zone_id, region).to_string(),
        format!("{:.prec$}", price.price_per_core, prec = PRICE_DECIMALS),
        format!("{:.1}", price.discount),
    ]
}

const HEADERS: [&str; 4] = ["Instance Type", "Zone", "Price/Core", "Discount"];

fn markdown_table(rows: &[(&InstancePrice, bool)], region: &str) -> String {
    let mut out = format!("| {} |\n| --- | --- | --- | --- |\n", HEADERS.join(" | "));
    for (price, highlight) in rows {
        let mut c = cells(price, region);
        if *highlight {
            c[0] = format!("<font color={}>{}</font>", HIGHLIGHT_COLOR, c[0]);
        }
        out.push_str(&format!("| {} |\n", c.join(" | ")));
    }
    out
}

fn text_table(rows: &[(&InstancePrice, bool)], region: &str) -> String {
    let all: Vec<([String; 4], bool)> = rows.iter().map(|(p, h)| (cells(p, region), *h)).collect();
    let mut widths = HEADERS.map(str::len);
    for (c, _) in &all {
        for (w, cell) in widths.iter_mut().zip(c.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |c: [&str; 4], marker: &str| {
        format!(
            "{}{:<w0$}  {:<w1$}  {:>w2$}  {:>w3$}\n",
            marker,
            c[0],
            c[1],
            c[2],
            c[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        )
    };

    let mut out = line(HEADERS, "  ");
    for (c, highlight) in &all {
        let marker = if *highlight { "! " } else { "  " };
        out.push_str(&line([c[0].as_str(), c[1].as_str(), c[2].as_str(), c[3].as_str()], marker));
    }
    out
}

/// Build the notification for one classified batch.
///
/// # Errors
///
/// Only a failing custom body template produces an error.
pub fn render_message(
    classified: &Classified,
    ctx: &RenderContext<'_>,
    renderer: &TemplateRenderer,
) -> Result<Notification, NotifyError> {
    let class = classified.classification;
    let region = ctx.query.region.as_str();
    let rows = display_rows(classified, ctx.options.color);

    let table = match &ctx.options.template {
        Some(template) => renderer.render(
            template,
            &TemplateData {
                rule: TemplateRule {
                    id: ctx.rule_id,
                    name: ctx.rule_name,
                },
                classification: class,
                threshold: classified.threshold,
                judged_by: classified.judged_by.as_str(),
                items: &classified.items,
                above: &classified.above,
                below: &classified.below,
                query: ctx.query,
                now: chrono::Utc::now().to_rfc3339(),
            },
        )?,
        None => match ctx.options.format {
            MessageFormat::Markdown => markdown_table(&rows, region),
            MessageFormat::Text => text_table(&rows, region),
        },
    };

    let footer = footer_text(classified, ctx.query);
    let body = match ctx.options.format {
        MessageFormat::Markdown => format!(
            "### <font color={} size=4>{}</font>\n\n{}\n\n##### <font color={}>{}</font>",
            title_color(class),
            title(class),
            table.trim_end(),
            FOOTER_COLOR,
            footer
        ),
        MessageFormat::Text => format!("{}\n\n{}\n\n{}", title(class), table.trim_end(), footer),
    };

    Ok(Notification {
        subject: format!("[{}] {}", title(class), ctx.rule_name),
        body,
        format: ctx.options.format,
        rule_id: ctx.rule_id.to_string(),
        classification: Some(class),
        count: classified.items.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spot_core::JudgedField;

    fn price(ty: &str, zone: &str, ppc: f64) -> InstancePrice {
        InstancePrice {
            instance_type_id: ty.to_string(),
            zone_id: zone.to_string(),
            core_count: 4,
            memory_gib: 8.0,
            price_per_core: ppc,
            spot_price: ppc * 4.0,
            origin_price: 2.0,
            discount: ppc * 4.0 * 10.0 / 2.0,
            volatility: 0.0,
        }
    }

    fn monitor_batch() -> Classified {
        let low = price("ecs.c5.xlarge", "cn-hangzhou-b", 0.3);
        let high = price("ecs.c6.xlarge", "cn-hangzhou-h", 0.9);
        Classified {
            classification: Classification::Monitor,
            threshold: Some(0.5),
            judged_by: JudgedField::PricePerCore,
            items: vec![low.clone(), high.clone()],
            above: vec![high],
            below: vec![low],
        }
    }

    fn render(classified: &Classified, options: &RenderOptions) -> Notification {
        let query = ResourceQuery::default();
        let ctx = RenderContext {
            rule_id: "hz",
            rule_name: "Hangzhou compute",
            query: &query,
            options,
        };
        render_message(classified, &ctx, &TemplateRenderer::new()).unwrap()
    }

    #[test]
    fn short_names() {
        assert_eq!(short_instance_type("ecs.c5.xlarge"), "c5.xlarge");
        assert_eq!(short_instance_type("c5.xlarge"), "c5.xlarge");
        assert_eq!(short_zone("cn-hangzhou-b", "cn-hangzhou"), "b");
        assert_eq!(short_zone("cn-beijing-a", "cn-hangzhou"), "cn-beijing-a");
    }

    #[test]
    fn monitor_lists_below_then_highlighted_above() {
        let n = render(&monitor_batch(), &RenderOptions::default());
        assert_eq!(n.subject, "[Monitor] Hangzhou compute");
        assert!(n.body.starts_with("### <font color=#33CCFF size=4>Monitor</font>"));

        let below = n.body.find("| c5.xlarge | b | 0.30000 |").unwrap();
        let above = n.body.find("| <font color=#DC143C>c6.xlarge</font> | h | 0.90000 |").unwrap();
        assert!(below < above);
        assert_eq!(n.body.matches("| Instance Type |").count(), 1);
        assert!(n.body.contains("threshold: 0.5 (price_per_core); conditions: region=cn-hangzhou"));
        assert_eq!(n.classification, Some(Classification::Monitor));
        assert_eq!(n.count, 2);
    }

    #[test]
    fn color_off_leaves_rows_plain() {
        let options = RenderOptions {
            color: false,
            ..Default::default()
        };
        let n = render(&monitor_batch(), &options);
        assert!(!n.body.contains("#DC143C"));
    }

    #[test]
    fn once_query_footer_has_conditions_only() {
        let p = price("ecs.c5.xlarge", "cn-hangzhou-b", 0.3);
        let batch = Classified {
            classification: Classification::OnceQuery,
            threshold: None,
            judged_by: JudgedField::PricePerCore,
            items: vec![p],
            above: vec![],
            below: vec![],
        };
        let n = render(&batch, &RenderOptions::default());
        assert!(n.body.contains("#1E90FF"));
        assert!(n.body.contains("Query Result"));
        assert!(!n.body.contains("threshold:"));
        assert!(n.body.contains("conditions: region=cn-hangzhou"));
    }

    #[test]
    fn text_format_marks_above_rows() {
        let options = RenderOptions {
            format: MessageFormat::Text,
            ..Default::default()
        };
        let n = render(&monitor_batch(), &options);
        assert_eq!(n.format, MessageFormat::Text);
        assert!(n.body.starts_with("Monitor\n\n"));
        assert!(n.body.lines().any(|l| l.starts_with("! c6.xlarge")));
        assert!(n.body.lines().any(|l| l.starts_with("  c5.xlarge")));
        assert!(!n.body.contains("<font"));
    }

    #[test]
    fn custom_template_replaces_table() {
        let options = RenderOptions {
            template: Some(
                "{% for p in above %}{{ p.instance_type_id | short_type }} over {{ threshold }}{% endfor %}"
                    .to_string(),
            ),
            ..Default::default()
        };
        let n = render(&monitor_batch(), &options);
        assert!(n.body.contains("c6.xlarge over 0.5"));
        assert!(!n.body.contains("| Instance Type |"));
        assert!(n.body.contains("##### <font color=#A9A9A9>"));
    }

    #[test]
    fn broken_template_is_an_error() {
        let options = RenderOptions {
            template: Some("{{ nope".to_string()),
            ..Default::default()
        };
        let query = ResourceQuery::default();
        let ctx = RenderContext {
            rule_id: "hz",
            rule_name: "hz",
            query: &query,
            options: &options,
        };
        assert!(render_message(&monitor_batch(), &ctx, &TemplateRenderer::new()).is_err());
    }
}
