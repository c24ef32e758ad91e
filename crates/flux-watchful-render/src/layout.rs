use flux_watchful::{Dashboard, MetricRef, Widget, DASHBOARD_WIDTH};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// 放置后的组件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWidget {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub properties: Value,
}

/// 仪表盘布局
///
/// 分区纵向堆叠，每个分区从新的一行开始；分区内的组件从左到右排列，
/// 超出 24 列时换行，行高取该行最高的组件。
pub fn layout(dashboard: &Dashboard) -> Vec<PlacedWidget> {
    let mut placed = Vec::with_capacity(dashboard.widget_count());
    let mut y = 0;

    for section in &dashboard.sections {
        let mut x = 0;
        let mut row_height = 0;

        for widget in &section.widgets {
            let width = widget.width().min(DASHBOARD_WIDTH);
            if x + width > DASHBOARD_WIDTH {
                y += row_height;
                x = 0;
                row_height = 0;
            }

            let (kind, properties) = widget_properties(widget);
            placed.push(PlacedWidget {
                kind,
                x,
                y,
                width,
                height: widget.height(),
                properties,
            });

            x += width;
            row_height = row_height.max(widget.height());
        }

        y += row_height;
    }

    placed
}

/// 仪表盘 body（JSON）
pub fn dashboard_body(dashboard: &Dashboard) -> Value {
    json!({ "widgets": layout(dashboard) })
}

fn widget_properties(widget: &Widget) -> (&'static str, Value) {
    match widget {
        Widget::Text { markdown, .. } => ("text", json!({ "markdown": markdown })),
        Widget::Graph {
            title,
            left,
            right,
            left_annotations,
            ..
        } => {
            let mut metrics: Vec<Value> = left.iter().map(|m| metric_entry(m, false)).collect();
            metrics.extend(right.iter().map(|m| metric_entry(m, true)));

            let mut properties = json!({
                "view": "timeSeries",
                "title": title,
                "metrics": metrics,
            });
            if !left_annotations.is_empty() {
                let horizontal: Vec<Value> = left_annotations
                    .iter()
                    .map(|a| json!({ "label": a.label, "value": a.value }))
                    .collect();
                properties["annotations"] = json!({ "horizontal": horizontal });
            }
            ("metric", properties)
        }
        Widget::SingleValue { title, metrics, .. } => (
            "metric",
            json!({
                "view": "singleValue",
                "title": title,
                "metrics": metrics.iter().map(|m| metric_entry(m, false)).collect::<Vec<_>>(),
            }),
        ),
    }
}

/// `[namespace, metric, dim1, value1, ..., {options}]`
fn metric_entry(metric: &MetricRef, right_axis: bool) -> Value {
    let mut entry = vec![
        Value::String(metric.namespace.clone()),
        Value::String(metric.metric_name.clone()),
    ];
    for (key, value) in &metric.dimensions {
        entry.push(Value::String(key.clone()));
        entry.push(Value::String(value.clone()));
    }

    let mut options = Map::new();
    options.insert("stat".to_string(), json!(metric.statistic.to_string()));
    options.insert("period".to_string(), json!(metric.period_secs));
    if let Some(label) = &metric.label {
        options.insert("label".to_string(), json!(label));
    }
    if right_axis {
        options.insert("yAxis".to_string(), json!("right"));
    }
    entry.push(Value::Object(options));

    Value::Array(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_watchful::{DashboardSection, ResourceHandle, Statistic};

    fn graph(width: u32, height: u32) -> Widget {
        Widget::graph("g", Vec::new()).with_size(width, height)
    }

    #[test]
    fn test_sections_stack_vertically() {
        let mut dashboard = Dashboard::new("d");

        let mut first = DashboardSection::with_heading("First", &[]);
        first.push(graph(8, 6));
        first.push(graph(8, 6));
        first.push(graph(8, 6));
        first.push(graph(12, 4));
        dashboard.add_section(first);

        let mut second = DashboardSection::new("Second");
        second.push(graph(12, 6));
        dashboard.add_section(second);

        let placed = layout(&dashboard);
        let positions: Vec<(u32, u32)> = placed.iter().map(|w| (w.x, w.y)).collect();

        assert_eq!(
            positions,
            vec![
                (0, 0),  // 标题，占满一行
                (0, 2),
                (8, 2),
                (16, 2),
                (0, 8),  // 换行
                (0, 12), // 新分区
            ]
        );
    }

    #[test]
    fn test_empty_dashboard_body() {
        let body = dashboard_body(&Dashboard::new("d"));
        assert_eq!(body, json!({ "widgets": [] }));
    }

    #[test]
    fn test_metric_entry() {
        let table = ResourceHandle::table("Default/Table", "orders");
        let metric = table
            .metric("ConsumedReadCapacityUnits", Statistic::Sum, 60)
            .with_label("Consumed");

        assert_eq!(
            metric_entry(&metric, true),
            json!([
                "AWS/DynamoDB",
                "ConsumedReadCapacityUnits",
                "TableName",
                "orders",
                { "stat": "Sum", "period": 60, "label": "Consumed", "yAxis": "right" }
            ])
        );
    }

    #[test]
    fn test_graph_annotations() {
        let widget = Widget::graph("Errors", Vec::new()).with_annotation("Alarm on", 5.0);
        let (kind, properties) = widget_properties(&widget);

        assert_eq!(kind, "metric");
        assert_eq!(
            properties["annotations"]["horizontal"][0],
            json!({ "label": "Alarm on", "value": 5.0 })
        );
    }
}
