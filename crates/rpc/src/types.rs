//! Payload types carried across the evaluator boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rendered output of an `evaluate`/`evaluateFragment` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
	/// The rendered document (or fragment) text.
	pub content: String,
	/// Non-fatal warnings, in the order the evaluator reported them.
	#[serde(default)]
	pub warnings: Vec<String>,
	/// Errors the evaluator recovered from while still producing output.
	#[serde(default)]
	pub errors: Vec<String>,
}

impl RenderOutput {
	/// Output with content only.
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			..Self::default()
		}
	}
}

/// One structured evaluation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	/// Human-readable message.
	pub message: String,
	/// Unprocessed evaluator payload the message was derived from.
	pub raw: String,
}

impl Diagnostic {
	/// Diagnostic whose raw payload is the message itself.
	pub fn from_message(message: impl Into<String>) -> Self {
		let message = message.into();
		Self {
			raw: message.clone(),
			message,
		}
	}
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirEntry {
	/// Leaf name (a single path segment).
	pub name: String,
	/// Whether the entry is a directory.
	pub is_directory: bool,
}

impl DirEntry {
	pub fn file(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			is_directory: false,
		}
	}

	pub fn directory(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			is_directory: true,
		}
	}
}

/// Metadata for a package loaded into the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
	pub name: String,
	pub version: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub transforms: Vec<TransformDescriptor>,
}

/// A transform a package contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDescriptor {
	pub from: String,
	#[serde(default)]
	pub to: Vec<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub arguments: Vec<ArgumentDescriptor>,
	#[serde(default)]
	pub variables: BTreeMap<String, VariableDescriptor>,
}

/// A named argument accepted by a transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
	pub name: String,
	#[serde(default)]
	pub default: Option<String>,
	#[serde(default)]
	pub description: String,
	#[serde(rename = "type")]
	pub kind: String,
}

/// A variable a transform reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
	#[serde(rename = "type")]
	pub kind: String,
	pub access: String,
}
