use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ProcessType;

/// Variant-specific part of a ticket node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Top-level aggregation ticket for one process.
    Process { process_type: ProcessType },
    /// Intermediate grouping ticket (for example a screen).
    Group { group_name: String },
    /// Leaf ticket carrying the task's effort for one process.
    Task {
        task_name: String,
        process_type: ProcessType,
    },
}

impl NodeKind {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Process { .. } => "process",
            Self::Group { .. } => "group",
            Self::Task { .. } => "task",
        }
    }
}

/// One ticket in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketNode {
    pub kind: NodeKind,
    pub subject: String,
    pub description: String,
    pub estimated_hours: f64,
    pub children: Vec<TicketNode>,
}

impl TicketNode {
    #[must_use]
    pub fn process(
        process_type: ProcessType,
        subject: impl Into<String>,
        description: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            kind: NodeKind::Process { process_type },
            subject: subject.into(),
            description: description.into(),
            estimated_hours: 0.0,
            children,
        }
    }

    #[must_use]
    pub fn group(
        group_name: impl Into<String>,
        subject: impl Into<String>,
        description: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            kind: NodeKind::Group {
                group_name: group_name.into(),
            },
            subject: subject.into(),
            description: description.into(),
            estimated_hours: 0.0,
            children,
        }
    }

    #[must_use]
    pub fn task(
        task_name: impl Into<String>,
        process_type: ProcessType,
        subject: impl Into<String>,
        description: impl Into<String>,
        estimated_hours: f64,
    ) -> Self {
        Self {
            kind: NodeKind::Task {
                task_name: task_name.into(),
                process_type,
            },
            subject: subject.into(),
            description: description.into(),
            estimated_hours,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn process_type(&self) -> Option<ProcessType> {
        match &self.kind {
            NodeKind::Process { process_type } | NodeKind::Task { process_type, .. } => {
                Some(*process_type)
            }
            NodeKind::Group { .. } => None,
        }
    }

    /// Name shown in the preview's name column; process nodes have none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.kind {
            NodeKind::Process { .. } => "—",
            NodeKind::Group { group_name } => group_name,
            NodeKind::Task { task_name, .. } => task_name,
        }
    }
}

/// A ticket that exists on the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub id: u64,
    pub subject: String,
    /// Zero-based depth in the submitted tree.
    pub level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

// ---------------------------------------------------------------------------
// Document encoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NodeTag {
    Process,
    #[serde(alias = "screen")]
    Group,
    Task,
}

#[derive(Serialize)]
struct NodeRef<'a> {
    #[serde(rename = "type")]
    tag: NodeTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_type: Option<ProcessType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_name: Option<&'a str>,
    subject: &'a str,
    description: &'a str,
    estimated_hours: f64,
    #[serde(skip_serializing_if = "is_leaf")]
    children: &'a [TicketNode],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_leaf(children: &&[TicketNode]) -> bool {
    children.is_empty()
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    tag: NodeTag,
    #[serde(default, alias = "processType")]
    process_type: Option<ProcessType>,
    #[serde(default, alias = "screenName", alias = "screen_name")]
    group_name: Option<String>,
    #[serde(default, alias = "taskName")]
    task_name: Option<String>,
    subject: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "estimatedHours")]
    estimated_hours: f64,
    #[serde(default)]
    children: Vec<TicketNode>,
}

impl TryFrom<RawNode> for TicketNode {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let missing =
            |field: &str| format!("{} node '{}' is missing {field}", raw.tag.as_str(), raw.subject);
        let kind = match raw.tag {
            NodeTag::Process => NodeKind::Process {
                process_type: raw.process_type.ok_or_else(|| missing("process_type"))?,
            },
            NodeTag::Group => NodeKind::Group {
                group_name: raw.group_name.ok_or_else(|| missing("group_name"))?,
            },
            NodeTag::Task => NodeKind::Task {
                task_name: raw.task_name.ok_or_else(|| missing("task_name"))?,
                process_type: raw.process_type.ok_or_else(|| missing("process_type"))?,
            },
        };
        Ok(Self {
            kind,
            subject: raw.subject,
            description: raw.description,
            estimated_hours: raw.estimated_hours,
            children: raw.children,
        })
    }
}

impl NodeTag {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Group => "group",
            Self::Task => "task",
        }
    }
}

impl Serialize for TicketNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (tag, process_type, group_name, task_name) = match &self.kind {
            NodeKind::Process { process_type } => (NodeTag::Process, Some(*process_type), None, None),
            NodeKind::Group { group_name } => (NodeTag::Group, None, Some(group_name.as_str()), None),
            NodeKind::Task {
                task_name,
                process_type,
            } => (
                NodeTag::Task,
                Some(*process_type),
                None,
                Some(task_name.as_str()),
            ),
        };
        NodeRef {
            tag,
            process_type,
            group_name,
            task_name,
            subject: &self.subject,
            description: &self.description,
            estimated_hours: self.estimated_hours,
            children: &self.children,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TicketNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNode::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}
