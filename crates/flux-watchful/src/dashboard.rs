use crate::metric::MetricRef;
use serde::{Deserialize, Serialize};

/// 仪表盘宽度（栅格列数）
pub const DASHBOARD_WIDTH: u32 = 24;

/// 图表上的水平参考线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizontalAnnotation {
    pub label: String,
    pub value: f64,
}

/// 仪表盘组件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Widget {
    /// Markdown 文本
    Text {
        markdown: String,
        width: u32,
        height: u32,
    },
    /// 指标曲线图
    Graph {
        title: String,
        left: Vec<MetricRef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        right: Vec<MetricRef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        left_annotations: Vec<HorizontalAnnotation>,
        width: u32,
        height: u32,
    },
    /// 单值
    SingleValue {
        title: String,
        metrics: Vec<MetricRef>,
        width: u32,
        height: u32,
    },
}

impl Widget {
    pub fn text(markdown: impl Into<String>) -> Self {
        Widget::Text {
            markdown: markdown.into(),
            width: DASHBOARD_WIDTH,
            height: 2,
        }
    }

    pub fn graph(title: impl Into<String>, left: Vec<MetricRef>) -> Self {
        Widget::Graph {
            title: title.into(),
            left,
            right: Vec::new(),
            left_annotations: Vec::new(),
            width: 8,
            height: 6,
        }
    }

    /// 给曲线图加一条阈值参考线，其他类型忽略
    pub fn with_annotation(mut self, label: impl Into<String>, value: f64) -> Self {
        if let Widget::Graph {
            left_annotations, ..
        } = &mut self
        {
            left_annotations.push(HorizontalAnnotation {
                label: label.into(),
                value,
            });
        }
        self
    }

    pub fn with_size(mut self, new_width: u32, new_height: u32) -> Self {
        match &mut self {
            Widget::Text { width, height, .. }
            | Widget::Graph { width, height, .. }
            | Widget::SingleValue { width, height, .. } => {
                *width = new_width.clamp(1, DASHBOARD_WIDTH);
                *height = new_height.max(1);
            }
        }
        self
    }

    pub fn width(&self) -> u32 {
        match self {
            Widget::Text { width, .. }
            | Widget::Graph { width, .. }
            | Widget::SingleValue { width, .. } => *width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Widget::Text { height, .. }
            | Widget::Graph { height, .. }
            | Widget::SingleValue { height, .. } => *height,
        }
    }
}

/// 仪表盘分区：一次 watch 调用产生的组件组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSection {
    pub title: String,
    /// 来源资源标识，自定义分区为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_identity: Option<String>,
    pub widgets: Vec<Widget>,
}

impl DashboardSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            resource_identity: None,
            widgets: Vec::new(),
        }
    }

    /// 带标题组件的分区，`links` 为 (文本, URL)
    pub fn with_heading(title: impl Into<String>, links: &[(String, String)]) -> Self {
        let title = title.into();
        let mut markdown = format!("# {}", title);
        if !links.is_empty() {
            let buttons = links
                .iter()
                .map(|(text, url)| format!("[button:{}]({})", text, url))
                .collect::<Vec<_>>()
                .join(" | ");
            markdown.push_str("\n\n");
            markdown.push_str(&buttons);
        }

        let mut section = Self::new(title);
        section.widgets.push(Widget::text(markdown));
        section
    }

    pub fn for_resource(mut self, identity: impl Into<String>) -> Self {
        self.resource_identity = Some(identity.into());
        self
    }

    pub fn push(&mut self, widget: Widget) {
        self.widgets.push(widget);
    }
}

/// 仪表盘，分区按追加顺序纵向排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub name: String,
    pub sections: Vec<DashboardSection>,
}

impl Dashboard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: DashboardSection) {
        self.sections.push(section);
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn widget_count(&self) -> usize {
        self.sections.iter().map(|s| s.widgets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
