//! Where a file sits in the backend and what it may reach.

use std::fmt;
use std::path::Path;

/// Outbound adapters; each one stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Adapter {
    Memory,
    Persistence,
    Paystack,
    Metrics,
}

impl Adapter {
    fn from_module(name: &str) -> Option<Self> {
        match name {
            "memory" => Some(Self::Memory),
            "persistence" => Some(Self::Persistence),
            "paystack" => Some(Self::Paystack),
            "metrics" => Some(Self::Metrics),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Persistence => "persistence",
            Self::Paystack => "paystack",
            Self::Metrics => "metrics",
        }
    }
}

/// The zone a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// `domain/mod.rs`, which re-exports everything below it.
    DomainRoot,
    /// Value types, validation, and access rules.
    Model,
    /// Driving and driven port traits under `domain/ports`.
    Ports,
    /// `*_service.rs` workflows and their test files.
    Services,
    /// HTTP handlers and session plumbing.
    Inbound,
    /// `outbound/mod.rs`.
    OutboundRoot,
    /// One outbound adapter tree.
    Adapter(Adapter),
}

impl Zone {
    /// Place a file given its path relative to `backend/src`.
    pub fn of(relative: &Path) -> Option<Self> {
        let owned: Vec<String> = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect();
        let parts: Vec<&str> = owned.iter().map(String::as_str).collect();
        let stem = relative.file_stem()?.to_string_lossy();
        match parts.as_slice() {
            ["domain", "mod.rs"] => Some(Self::DomainRoot),
            ["domain", "ports", ..] => Some(Self::Ports),
            ["domain", _] if is_service_file(&stem) => Some(Self::Services),
            ["domain", ..] => Some(Self::Model),
            ["inbound", ..] => Some(Self::Inbound),
            ["outbound", "mod.rs"] => Some(Self::OutboundRoot),
            ["outbound", adapter, ..] => {
                let name: &str = adapter.strip_suffix(".rs").unwrap_or(adapter);
                Adapter::from_module(name).map(Self::Adapter)
            }
            _ => None,
        }
    }

    /// Whether code in this zone may name `target`.
    pub fn may_reach(self, target: Target) -> bool {
        match (self, target) {
            (Self::Inbound, Target::Inbound) => true,
            (_, Target::Inbound) => false,
            (Self::Inbound | Self::Model | Self::Ports | Self::Services | Self::DomainRoot, _)
                if target.is_outbound() =>
            {
                false
            }
            (Self::Adapter(own), Target::Adapter(other)) => own == other,
            (Self::Model, Target::Ports | Target::Services) => false,
            (Self::Ports, Target::Services) => false,
            _ => true,
        }
    }

    /// Crate families this zone must not use.
    pub fn banned_families(self) -> &'static [CrateFamily] {
        use CrateFamily::{Database, HttpClient, Metrics, OpenApi, Signing, Web};
        match self {
            Self::DomainRoot | Self::Model | Self::Ports | Self::Services => {
                &[Web, OpenApi, Database, HttpClient, Signing, Metrics]
            }
            Self::Inbound => &[Database, HttpClient, Signing, Metrics],
            Self::OutboundRoot => &[Web, OpenApi],
            Self::Adapter(Adapter::Memory) => &[Web, OpenApi, Database, HttpClient, Signing],
            Self::Adapter(Adapter::Persistence) => &[Web, OpenApi, HttpClient, Signing, Metrics],
            Self::Adapter(Adapter::Paystack) => &[Web, OpenApi, Database, Metrics],
            Self::Adapter(Adapter::Metrics) => &[Web, OpenApi, Database, HttpClient, Signing],
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainRoot => f.write_str("domain root"),
            Self::Model => f.write_str("domain model"),
            Self::Ports => f.write_str("domain ports"),
            Self::Services => f.write_str("domain service"),
            Self::Inbound => f.write_str("inbound adapter"),
            Self::OutboundRoot => f.write_str("outbound root"),
            Self::Adapter(adapter) => write!(f, "{} adapter", adapter.name()),
        }
    }
}

fn is_service_file(stem: &str) -> bool {
    stem.ends_with("_service") || stem.ends_with("_service_tests")
}

/// An internal module a path points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    Ports,
    Services,
    Inbound,
    /// `crate::outbound` itself.
    OutboundRoot,
    Adapter(Adapter),
}

impl Target {
    /// Classify an absolute module path (without the leading `crate`).
    pub fn of(absolute: &[String]) -> Option<Self> {
        let first = absolute.first()?.as_str();
        let second = absolute.get(1).map(String::as_str);
        match (first, second) {
            ("inbound", _) => Some(Self::Inbound),
            ("outbound", None | Some("*")) => Some(Self::OutboundRoot),
            ("outbound", Some(name)) => Adapter::from_module(name).map(Self::Adapter),
            ("domain", Some("ports")) => Some(Self::Ports),
            ("domain", Some(name)) if is_service_file(name) || is_service_type(name) => {
                Some(Self::Services)
            }
            _ => None,
        }
    }

    const fn is_outbound(self) -> bool {
        matches!(self, Self::OutboundRoot | Self::Adapter(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ports => f.write_str("domain ports"),
            Self::Services => f.write_str("domain services"),
            Self::Inbound => f.write_str("crate::inbound"),
            Self::OutboundRoot => f.write_str("crate::outbound"),
            Self::Adapter(adapter) => write!(f, "the {} adapter", adapter.name()),
        }
    }
}

/// Service types re-exported from `domain`, such as `LedgerService`.
fn is_service_type(name: &str) -> bool {
    name.ends_with("Service") && name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Groups of third-party crates that belong to one adapter concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrateFamily {
    Web,
    OpenApi,
    Database,
    HttpClient,
    Signing,
    Metrics,
}

impl CrateFamily {
    /// Family of an external crate root, if it belongs to one.
    pub fn of(root: &str) -> Option<Self> {
        match root {
            "actix" | "actix_service" | "actix_session" | "actix_web" | "actix_web_prom" => {
                Some(Self::Web)
            }
            "utoipa" | "utoipa_swagger_ui" => Some(Self::OpenApi),
            "diesel" | "diesel_async" | "diesel_migrations" => Some(Self::Database),
            "reqwest" => Some(Self::HttpClient),
            "hmac" => Some(Self::Signing),
            "prometheus" => Some(Self::Metrics),
            _ => None,
        }
    }

    /// Label used in violation messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Web => "web framework",
            Self::OpenApi => "OpenAPI",
            Self::Database => "database",
            Self::HttpClient => "HTTP client",
            Self::Signing => "webhook signing",
            Self::Metrics => "metrics",
        }
    }
}
