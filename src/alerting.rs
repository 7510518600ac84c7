//! heartbeat alarms and the fleet status dashboard
//!
//! alarms are keyed by the immutable identifier so alarm history survives
//! renames; only titles and descriptions carry the human-facing names.
//! widgets are a typed structure serialized once, at the boundary.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::courier::{APPLICATION_NAME, HEARTBEAT_METRIC, HEARTBEAT_NAMESPACE, NODE_DIMENSION};
use crate::error::Result;
use crate::identity::{NodeIdentity, ResolvedIdentity};

/// a metric dimension pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// missing-heartbeat alarm specification for one node
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeartbeatAlarm {
    /// immutable identifier; the alarm's history join key
    pub alarm_name: String,
    pub description: String,
    pub metric_name: String,
    pub namespace: String,
    pub statistic: String,
    pub comparison_operator: String,
    pub threshold: u32,
    pub evaluation_periods: u32,
    /// one period of silence this long triggers the alarm
    pub period_seconds: u32,
    pub treat_missing_data: String,
    pub dimensions: Vec<Dimension>,
    /// notification endpoints for the provisioning layer to subscribe
    pub emails: BTreeSet<String>,
}

/// derive the heartbeat alarm for one node
pub fn heartbeat_alarm(node: &NodeIdentity, resolved: &ResolvedIdentity) -> HeartbeatAlarm {
    HeartbeatAlarm {
        alarm_name: resolved.immutable_id.clone(),
        description: format!(
            "The upload agent for {} at {} is unresponsive.",
            node.name, node.location
        ),
        metric_name: HEARTBEAT_METRIC.to_string(),
        namespace: HEARTBEAT_NAMESPACE.to_string(),
        statistic: "Sum".to_string(),
        comparison_operator: "LessThanThreshold".to_string(),
        threshold: 1,
        evaluation_periods: 1,
        period_seconds: node.alerting.timeout_seconds,
        treat_missing_data: "breaching".to_string(),
        dimensions: vec![
            Dimension {
                name: "Application".to_string(),
                value: APPLICATION_NAME.to_string(),
            },
            Dimension {
                name: NODE_DIMENSION.to_string(),
                value: resolved.immutable_id.clone(),
            },
        ],
        emails: node.alerting.emails.clone(),
    }
}

const WIDGET_WIDTH: u32 = 6;
const WIDGET_HEIGHT: u32 = 6;
const ALARM_STRIP_HEIGHT: u32 = 2;

/// a dashboard widget, tagged by kind at the serialization boundary
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    Metric {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        properties: MetricWidgetProps,
    },
    Alarm {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        properties: AlarmWidgetProps,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricWidgetProps {
    /// metric path: namespace, metric, then dimension name/value pairs
    pub metrics: Vec<Vec<String>>,
    pub period: u32,
    pub stat: String,
    pub region: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlarmWidgetProps {
    pub alarms: Vec<String>,
    pub title: String,
}

/// lay out one heartbeat widget per alarm under a full-width alarm strip
pub fn dashboard_widgets(alarms: &[HeartbeatAlarm], region: &str) -> Vec<Widget> {
    let mut widgets = vec![Widget::Alarm {
        x: 0,
        y: 0,
        width: WIDGET_WIDTH * 2,
        height: ALARM_STRIP_HEIGHT,
        properties: AlarmWidgetProps {
            alarms: alarms.iter().map(|a| a.alarm_name.clone()).collect(),
            title: "Upload Agent Alarm Status".to_string(),
        },
    }];

    for (index, alarm) in alarms.iter().enumerate() {
        let index = index as u32;
        let node_dimension = alarm
            .dimensions
            .iter()
            .find(|d| d.name == NODE_DIMENSION)
            .map(|d| d.value.clone())
            .unwrap_or_else(|| alarm.alarm_name.clone());

        widgets.push(Widget::Metric {
            x: WIDGET_WIDTH * (index % 2),
            y: ALARM_STRIP_HEIGHT + WIDGET_HEIGHT * (index / 2),
            width: WIDGET_WIDTH,
            height: WIDGET_HEIGHT,
            properties: MetricWidgetProps {
                metrics: vec![vec![
                    HEARTBEAT_NAMESPACE.to_string(),
                    HEARTBEAT_METRIC.to_string(),
                    "Application".to_string(),
                    APPLICATION_NAME.to_string(),
                    NODE_DIMENSION.to_string(),
                    node_dimension,
                ]],
                period: 60,
                stat: "Sum".to_string(),
                region: region.to_string(),
                title: format!("Heartbeat for {}", alarm.alarm_name),
            },
        });
    }

    widgets
}

/// serialize the dashboard body once, at the boundary
pub fn dashboard_body(widgets: &[Widget]) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({ "widgets": widgets }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityResolver, NodeIdentity, NodeLocation};

    fn alarm_for(name: &str, location: &str) -> HeartbeatAlarm {
        let mut node = NodeIdentity::new(name, NodeLocation::new(location));
        node.alerting.emails.insert("lab@example.com".to_string());
        let resolved = IdentityResolver::new().resolve(&node).unwrap();
        heartbeat_alarm(&node, &resolved)
    }

    #[test]
    fn test_alarm_keyed_by_immutable_id() {
        let mut node = NodeIdentity::new("Cytation-6", NodeLocation::new("Cambridge"));
        node.original_name = Some("Cytation-5".to_string());
        node.original_location = Some(NodeLocation::new("Cambridge"));
        let resolved = IdentityResolver::new().resolve(&node).unwrap();

        let alarm = heartbeat_alarm(&node, &resolved);

        // alarm history stays joined to the original identity
        assert_eq!(alarm.alarm_name, "cambridge--cytation-5");
        // but the human-facing description shows the current name
        assert!(alarm.description.contains("Cytation-6"));
    }

    #[test]
    fn test_alarm_uses_alerting_timeout() {
        let mut node = NodeIdentity::new("Cytation-5", NodeLocation::new("Cambridge"));
        node.alerting.timeout_seconds = 900;
        let resolved = IdentityResolver::new().resolve(&node).unwrap();

        let alarm = heartbeat_alarm(&node, &resolved);
        assert_eq!(alarm.period_seconds, 900);
        assert_eq!(alarm.treat_missing_data, "breaching");
        assert_eq!(alarm.threshold, 1);
    }

    #[test]
    fn test_alarm_dimensions() {
        let alarm = alarm_for("Cytation-5", "Cambridge");

        assert_eq!(alarm.namespace, HEARTBEAT_NAMESPACE);
        assert_eq!(alarm.dimensions.len(), 2);
        assert_eq!(alarm.dimensions[1].name, NODE_DIMENSION);
        assert_eq!(alarm.dimensions[1].value, "cambridge--cytation-5");
        assert!(alarm.emails.contains("lab@example.com"));
    }

    #[test]
    fn test_dashboard_layout() {
        let alarms = vec![
            alarm_for("Cytation-5", "Cambridge"),
            alarm_for("Nikon-Ti2", "Emeryville"),
            alarm_for("Opentrons-2", "Cambridge"),
        ];

        let widgets = dashboard_widgets(&alarms, "us-east-1");
        assert_eq!(widgets.len(), 4);

        // alarm strip first, full width, at the top
        match &widgets[0] {
            Widget::Alarm { x, y, properties, .. } => {
                assert_eq!((*x, *y), (0, 0));
                assert_eq!(properties.alarms.len(), 3);
            }
            other => panic!("expected alarm strip, got {other:?}"),
        }

        // metric widgets fill a two-column grid below the strip
        match (&widgets[1], &widgets[2], &widgets[3]) {
            (
                Widget::Metric { x: x0, y: y0, .. },
                Widget::Metric { x: x1, y: y1, .. },
                Widget::Metric { x: x2, y: y2, .. },
            ) => {
                assert_eq!((*x0, *y0), (0, 2));
                assert_eq!((*x1, *y1), (6, 2));
                assert_eq!((*x2, *y2), (0, 8));
            }
            other => panic!("expected metric widgets, got {other:?}"),
        }
    }

    #[test]
    fn test_dashboard_body_tagged_variants() {
        let widgets = dashboard_widgets(&[alarm_for("Cytation-5", "Cambridge")], "us-east-1");
        let body = dashboard_body(&widgets).unwrap();

        assert!(body.contains("\"widgets\""));
        assert!(body.contains("\"type\":\"alarm\""));
        assert!(body.contains("\"type\":\"metric\""));
        assert!(body.contains(HEARTBEAT_NAMESPACE));
    }
}
