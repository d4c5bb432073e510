//! Built-in seed content.
//!
//! This is what a fresh install shows and what `reset` restores.

use crate::model::{Category, ContentDocument, ContentStore, Quarter, RoadmapData, Section, Task};

fn section(id: &str, title: &str, paragraphs: &[&str]) -> Section {
    Section::new(id, title, paragraphs.join(crate::model::PARAGRAPH_DELIMITER))
}

fn document(title: &str, subtitle: &str, sections: Vec<Section>) -> ContentDocument {
    ContentDocument {
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        sections,
    }
}

pub fn default_content() -> ContentStore {
    ContentStore {
        technical_whitepaper: document(
            "Technical Whitepaper",
            "Xandeum Finance: Decentralized Personal Finance Management",
            vec![
                section(
                    "executive-summary",
                    "Executive Summary",
                    &[
                        "Xandeum Finance represents a paradigm shift in personal financial management, leveraging Xandeum's storage layer to create a truly decentralized, comprehensive financial platform. Unlike traditional financial applications that rely on centralized databases and limited storage capacity, Xandeum Finance harnesses exabyte-scale storage, smart contract native architecture, and random access capabilities to deliver financial insights and automation.",
                        "The platform addresses critical limitations in current personal finance solutions: data silos, limited historical analysis, security vulnerabilities, and lack of true user ownership. Users keep complete control over their financial data while accessing analytics previously available only to institutional investors.",
                        "Key innovations include real-time cross-platform data aggregation, predictive analytics with unlimited historical context, automated financial rule execution through smart contracts, and decentralized identity management.",
                    ],
                ),
                section(
                    "technical-architecture",
                    "Technical Architecture",
                    &["Our technical architecture implements a four-layer approach: the Storage Abstraction Layer interfaces with Xandeum's decentralized storage, the Financial Processing Engine handles data ingestion and analysis, the Business Logic Layer manages financial algorithms and smart contracts, and the User Interface Layer provides access to complex financial insights."],
                ),
            ],
        ),
        architecture_overview: document(
            "Architecture Overview",
            "System Design and Component Interactions",
            vec![
                section(
                    "system-architecture",
                    "System Architecture",
                    &[
                        "Xandeum Finance employs a microservices architecture optimized for scalability, maintainability, and performance, designed to handle millions of users with sub-second response times for complex financial queries.",
                        "The architecture follows domain-driven design principles, with clear boundaries between financial data management, user authentication, portfolio analysis, and external integrations.",
                        "Core services include User Management, Data Ingestion, Transaction Processing, Portfolio Analytics, and Notifications.",
                    ],
                ),
                section(
                    "deployment-scalability",
                    "Deployment & Scalability",
                    &["Deployment utilizes containerized services orchestrated through Kubernetes, enabling automatic scaling, rolling updates, and fault tolerance."],
                ),
            ],
        ),
        xandeum_integration: document(
            "Xandeum Integration",
            "Leveraging Decentralized Storage Capabilities",
            vec![
                section(
                    "storage-layer-integration",
                    "Storage Layer Integration",
                    &[
                        "Integration with Xandeum's storage layer is the core innovation that enables new capabilities in personal finance management.",
                        "The Storage Abstraction Layer provides a unified interface to Xandeum's decentralized storage network while hiding the underlying blockchain complexity from application components.",
                        "Data distribution utilizes Xandeum's pNode network for high availability and fault tolerance, with cryptographic verification ensuring data integrity.",
                    ],
                ),
                section(
                    "encryption-privacy",
                    "Encryption & Privacy",
                    &["Client-side encryption with user-controlled keys keeps financial data private even from platform operators."],
                ),
                section(
                    "caching-performance",
                    "Caching & Performance",
                    &[
                        "Frequently accessed data is cached in fast local storage while Xandeum's random access capabilities serve comprehensive historical queries.",
                        "Data lifecycle management implements automated policies for retention, archival, and deletion based on user preferences and regulatory requirements.",
                    ],
                ),
            ],
        ),
        financial_features: document(
            "Financial Features",
            "Comprehensive Personal Finance Management Capabilities",
            vec![
                section(
                    "account-aggregation",
                    "Account Aggregation",
                    &[
                        "Account aggregation connects all financial accounts into a unified dashboard across traditional banking, investment accounts, cryptocurrency holdings, and alternative assets.",
                        "Bank integration supports checking, savings, money market, and certificate of deposit accounts through Open Banking APIs and direct connections.",
                        "Investment connectivity includes brokerage and retirement accounts, tracking positions, performance, dividends, and tax implications.",
                    ],
                ),
                section(
                    "cryptocurrency-integration",
                    "Cryptocurrency Integration",
                    &["Supports major exchanges, DeFi protocols, and hardware wallets, tracking holdings, staking rewards, yield farming, and NFT collections."],
                ),
                section(
                    "real-estate-alternative",
                    "Real Estate & Alternative Investments",
                    &[
                        "Real estate tracking covers primary residences, investment properties, REITs, and crowdfunding platforms.",
                        "Alternative investments include commodities, precious metals, collectibles, private equity, and peer-to-peer lending.",
                    ],
                ),
                section(
                    "advanced-analytics",
                    "Advanced Analytics",
                    &["Portfolio analysis with performance tracking, risk assessment, and automated rebalancing recommendations."],
                ),
            ],
        ),
    }
}

fn task(id: &str, title: &str, description: &str, category: Category, progress: u8) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category,
        progress,
    }
}

/// Seed roadmap, stamped with `today` (`YYYY-MM-DD`).
pub fn default_roadmap(today: &str) -> RoadmapData {
    use Category::*;

    RoadmapData {
        last_updated: today.to_string(),
        quarters: vec![
            Quarter {
                id: "q1-2026".into(),
                name: "Q1 2026".into(),
                tasks: vec![
                    task("project-setup", "Project Setup & Infrastructure", "Development environment, CI/CD pipeline, security framework", Foundation, 100),
                    task("xandeum-storage", "Xandeum Storage Abstraction", "Storage simulation layer with Xandeum primitives", Foundation, 85),
                    task("authentication", "Authentication System", "User management with blockchain identity support", Foundation, 90),
                    task("core-ui", "Core UI Components", "Design system and responsive component library", Frontend, 75),
                ],
            },
            Quarter {
                id: "q2-2026".into(),
                name: "Q2 2026".into(),
                tasks: vec![
                    task("transaction-engine", "Transaction Processing Engine", "Data ingestion, categorization, and duplicate detection", Financial, 60),
                    task("account-aggregation", "Account Aggregation System", "Financial institution connectors and data sync", Financial, 45),
                    task("financial-dashboard", "Basic Financial Dashboard", "Account overview and transaction displays", Financial, 70),
                    task("data-encryption", "Data Encryption Framework", "Client-side encryption and key management", Foundation, 80),
                ],
            },
            Quarter {
                id: "q3-2026".into(),
                name: "Q3 2026".into(),
                tasks: vec![
                    task("investment-tracking", "Investment Portfolio Tracking", "Position tracking and performance analytics", Analytics, 30),
                    task("financial-health", "Financial Health Assessment", "Health scoring and cash flow analysis", Analytics, 25),
                    task("goal-management", "Goal Management System", "Goal setting, tracking, and progress monitoring", Financial, 20),
                    task("advanced-ui", "Advanced UI Features", "Interactive charts and data visualizations", Frontend, 40),
                ],
            },
        ],
    }
}
