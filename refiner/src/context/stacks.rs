//! Technology knowledge table
//!
//! Per-technology contextual questions, best practices and common issues.
//! Combined entries apply when the selection is exactly their set of stacks.

use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::QuestionKind::{Scenario, Specification};
use crate::domain::{MAX_ANSWERS, QuestionKind, RefinementQuestion};

/// A question template from the knowledge table
#[derive(Debug, Clone, Copy)]
pub struct QuestionTemplate {
    pub id: &'static str,
    pub kind: QuestionKind,
    pub question: &'static str,
    pub answers: &'static [&'static str],
    pub required: bool,
    pub depends_on: &'static [&'static str],
}

impl QuestionTemplate {
    pub fn to_question(&self) -> RefinementQuestion {
        let answers = self.answers.iter().take(MAX_ANSWERS).map(|a| a.to_string()).collect();
        let q = RefinementQuestion::new(self.id, self.kind, self.question, answers).depends_on(self.depends_on.iter().copied());
        if self.required { q.required() } else { q }
    }
}

/// Knowledge for one technology or technology combination
#[derive(Debug, Clone, Copy)]
pub struct StackKnowledge {
    pub name: &'static str,
    /// Selection this entry applies to
    pub stacks: &'static [&'static str],
    pub questions: &'static [QuestionTemplate],
    pub best_practices: &'static [&'static str],
    pub common_issues: &'static [&'static str],
}

const fn q(
    id: &'static str,
    kind: QuestionKind,
    question: &'static str,
    answers: &'static [&'static str],
    required: bool,
    depends_on: &'static [&'static str],
) -> QuestionTemplate {
    QuestionTemplate {
        id,
        kind,
        question,
        answers,
        required,
        depends_on,
    }
}

pub const KNOWN_STACKS: &[StackKnowledge] = &[
    StackKnowledge {
        name: "React",
        stacks: &["React"],
        questions: &[
            q("react-version", Specification, "Which React version are you working with?",
                &["React 18+", "React 17", "React 16", "Not sure"], false, &[]),
            q("react-architecture", Specification, "What's your preferred React architecture?",
                &["Functional Components with Hooks", "Class Components", "Mixed approach"], true, &["react-version"]),
            q("react-state", Specification, "How do you plan to manage state?",
                &["useState + useReducer", "Redux Toolkit", "Zustand", "Context API", "External state management"], false, &["react-architecture"]),
        ],
        best_practices: &[
            "Use functional components with hooks",
            "Implement proper TypeScript typing",
            "Follow React best practices for performance",
            "Consider code splitting for larger apps",
        ],
        common_issues: &[
            "Props typing with TypeScript",
            "State management patterns",
            "Component re-rendering optimization",
            "Hook dependency arrays",
        ],
    },
    StackKnowledge {
        name: "TypeScript",
        stacks: &["TypeScript"],
        questions: &[
            q("typescript-experience", Specification, "What's your TypeScript experience level?",
                &["Beginner", "Intermediate", "Advanced", "Expert"], true, &[]),
            q("typescript-strictness", Specification, "How strict should TypeScript configuration be?",
                &["Very strict (all strict checks)", "Moderately strict", "Lenient mode"], false, &["typescript-experience"]),
            q("typescript-features", Specification, "Which TypeScript features are most important?",
                &["Type safety only", "Advanced types (generics, utilities)", "Decorators", "All features"], false, &["typescript-experience"]),
        ],
        best_practices: &[
            "Use interfaces over types for object shapes",
            "Leverage TypeScript's type inference",
            "Create proper generic types",
            "Use strict mode configurations",
        ],
        common_issues: &[
            "Typing React props",
            "Generic type parameters",
            "Union and intersection types",
            "Type assertion vs type guards",
        ],
    },
    StackKnowledge {
        name: "Node.js",
        stacks: &["Node.js"],
        questions: &[
            q("nodejs-version", Specification, "Which Node.js version are you targeting?",
                &["Node.js 20+ (LTS)", "Node.js 18 (LTS)", "Node.js 16 (LTS)", "Latest version"], true, &[]),
            q("nodejs-framework", Specification, "What Node.js framework are you using?",
                &["Express.js", "Fastify", "NestJS", "Custom/Other"], false, &["nodejs-version"]),
            q("nodejs-purpose", Scenario, "What's the main purpose of your Node.js application?",
                &["REST API", "GraphQL API", "Microservices", "CLI tool"], false, &["nodejs-framework"]),
        ],
        best_practices: &[
            "Use async/await over callbacks",
            "Implement proper error handling",
            "Use environment variables for configuration",
            "Follow Node.js security best practices",
        ],
        common_issues: &[
            "Callback hell vs Promises",
            "Error handling patterns",
            "Memory management",
            "Performance optimization",
        ],
    },
    StackKnowledge {
        name: "Python",
        stacks: &["Python"],
        questions: &[
            q("python-version", Specification, "Which Python version are you using?",
                &["Python 3.11+", "Python 3.10", "Python 3.9", "Not sure"], true, &[]),
            q("python-framework", Specification, "What Python framework/library are you working with?",
                &["Django", "Flask", "FastAPI", "Pandas/NumPy"], false, &["python-version"]),
            q("python-usecase", Scenario, "What type of Python development are you doing?",
                &["Web development", "Data science", "Automation scripting", "API development"], false, &["python-framework"]),
        ],
        best_practices: &[
            "Use type hints for better code documentation",
            "Follow PEP 8 style guidelines",
            "Use virtual environments for dependency management",
            "Implement proper exception handling",
        ],
        common_issues: &[
            "Dependency management with pip/poetry",
            "Virtual environment setup",
            "Type hinting best practices",
            "Performance optimization",
        ],
    },
    StackKnowledge {
        name: "Testing",
        stacks: &["Testing"],
        questions: &[
            q("testing-type", Specification, "What type of testing do you need?",
                &["Unit testing only", "Integration testing", "E2E testing", "Full testing suite"], true, &[]),
            q("testing-framework", Specification, "Which testing framework are you using?",
                &["Jest", "Vitest", "PyTest", "Custom/Other"], false, &["testing-type"]),
            q("testing-coverage", Specification, "What's your target test coverage?",
                &["Above 90%", "70-90%", "50-70%", "Just critical paths"], false, &["testing-framework"]),
        ],
        best_practices: &[
            "Write descriptive test names",
            "Follow AAA (Arrange-Act-Assert) pattern",
            "Mock external dependencies properly",
            "Test edge cases and error scenarios",
        ],
        common_issues: &[
            "Mock setup and teardown",
            "Async testing patterns",
            "Test data management",
            "Coverage requirements",
        ],
    },
    StackKnowledge {
        name: "Docker",
        stacks: &["Docker"],
        questions: &[
            q("docker-purpose", Scenario, "What's the main purpose of using Docker?",
                &["Development environment", "Production deployment", "CI/CD pipeline", "Microservices"], true, &[]),
            q("docker-type", Specification, "What type of Docker setup do you need?",
                &["Single container application", "Multi-container with Docker Compose", "Kubernetes deployment", "Development environment only"], false, &["docker-purpose"]),
            q("docker-base-image", Specification, "What base image preference do you have?",
                &["Alpine Linux (lightweight)", "Ubuntu/Debian (full-featured)", "Distroless (minimal)", "Official language images"], false, &["docker-type"]),
        ],
        best_practices: &[
            "Use multi-stage builds for smaller images",
            "Minimize layer count",
            "Use .dockerignore files",
            "Don't run as root user",
        ],
        common_issues: &[
            "Image size optimization",
            "Volume mounting",
            "Network configuration",
            "Environment variable management",
        ],
    },
    StackKnowledge {
        name: "PostgreSQL",
        stacks: &["PostgreSQL"],
        questions: &[
            q("postgres-version", Specification, "Which PostgreSQL version are you using?",
                &["PostgreSQL 15+", "PostgreSQL 14", "PostgreSQL 13", "Older version"], true, &[]),
            q("postgres-usecase", Scenario, "What's your primary use case for PostgreSQL?",
                &["OLTP application", "Analytics/Reporting", "Hybrid workload", "JSON document storage"], false, &["postgres-version"]),
            q("postgres-orm", Specification, "How are you interacting with PostgreSQL?",
                &["Prisma", "SQLAlchemy", "Raw SQL", "Other ORM"], false, &["postgres-usecase"]),
        ],
        best_practices: &[
            "Use appropriate indexes for query performance",
            "Implement proper connection pooling",
            "Use transactions for data consistency",
            "Regular database maintenance",
        ],
        common_issues: &[
            "Query optimization",
            "Connection management",
            "Indexing strategies",
            "Migration management",
        ],
    },
];

pub const COMBINED_STACKS: &[StackKnowledge] = &[
    StackKnowledge {
        name: "React+TypeScript",
        stacks: &["React", "TypeScript"],
        questions: &[
            q("react-typescript-setup", Specification, "How are you setting up React with TypeScript?",
                &["Create React App (TypeScript template)", "Vite + React + TypeScript", "Next.js", "Custom Webpack config"], true, &[]),
            q("react-typescript-state", Specification, "How will you handle state typing?",
                &["Strict typing with interfaces", "Type inference preferred", "Mixed approach", "Custom typing utilities"], false, &["react-typescript-setup"]),
        ],
        best_practices: &[
            "Use React.FC for functional components",
            "Type props with interfaces",
            "Use proper generic types for hooks",
            "Leverage TypeScript for component prop validation",
        ],
        common_issues: &[
            "Typing children props",
            "Generic component patterns",
            "Event handler typing",
            "Context provider typing",
        ],
    },
    StackKnowledge {
        name: "Express+Node.js",
        stacks: &["Express.js", "Node.js"],
        questions: &[
            q("express-typescript", Specification, "Are you using TypeScript with Express?",
                &["Yes, full TypeScript setup", "JavaScript with JSDoc", "Pure JavaScript"], true, &[]),
            q("express-architecture", Specification, "What's your Express application architecture?",
                &["MVC pattern", "Modular with routers", "Microservices", "Simple monolith"], false, &["express-typescript"]),
        ],
        best_practices: &[
            "Use Express Router for organization",
            "Implement middleware properly",
            "Use async/await with error handling",
            "Environment-based configuration",
        ],
        common_issues: &[
            "Async middleware error handling",
            "Request/response typing",
            "Route organization",
            "Middleware order",
        ],
    },
    StackKnowledge {
        name: "Node.js+React",
        stacks: &["Node.js", "React"],
        questions: &[
            q("fullstack-type", Specification, "What type of full-stack application are you building?",
                &["SPA with REST API", "SSR application", "Static site generation", "Real-time application"], true, &[]),
            q("fullstack-deployment", Specification, "How will you deploy this application?",
                &["Monolithic deployment", "Separate frontend/backend", "Serverless functions", "Containerized deployment"], false, &["fullstack-type"]),
        ],
        best_practices: &[
            "API versioning",
            "CORS configuration",
            "Authentication between services",
            "Error handling across layers",
        ],
        common_issues: &[
            "CORS configuration",
            "Authentication flow",
            "API communication patterns",
            "Deployment strategy",
        ],
    },
];

/// Look up a single technology by name (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static StackKnowledge> {
    KNOWN_STACKS.iter().find(|k| k.name.eq_ignore_ascii_case(name.trim()))
}

/// The combined entry whose stack set equals the selection
pub fn combined_for(stacks: &BTreeSet<String>) -> Option<&'static StackKnowledge> {
    if stacks.len() < 2 {
        return None;
    }
    COMBINED_STACKS.iter().find(|k| {
        k.stacks.len() == stacks.len() && k.stacks.iter().all(|s| stacks.contains(*s))
    })
}

/// Best practices of each selected stack, then of the combined entry,
/// de-duplicated in first-seen order
pub fn best_practices(stacks: &BTreeSet<String>) -> Vec<&'static str> {
    debug!(?stacks, "best_practices: called");
    collect(stacks, |k| k.best_practices)
}

/// Common issues, ordered and de-duplicated like [`best_practices`]
pub fn common_issues(stacks: &BTreeSet<String>) -> Vec<&'static str> {
    debug!(?stacks, "common_issues: called");
    collect(stacks, |k| k.common_issues)
}

fn collect(stacks: &BTreeSet<String>, field: fn(&StackKnowledge) -> &'static [&'static str]) -> Vec<&'static str> {
    let entries = stacks.iter().filter_map(|s| lookup(s)).chain(combined_for(stacks));
    let mut out: Vec<&'static str> = Vec::new();
    for item in entries.flat_map(field) {
        if !out.contains(item) {
            out.push(*item);
        }
    }
    out
}

/// Contextual questions for the selection: the combined entry's first, then
/// each stack's, ordered so that dependencies come before dependents
pub fn contextual_questions(stacks: &BTreeSet<String>) -> Vec<RefinementQuestion> {
    debug!(?stacks, "contextual_questions: called");
    let questions: Vec<RefinementQuestion> = combined_for(stacks)
        .into_iter()
        .chain(stacks.iter().filter_map(|s| lookup(s)))
        .flat_map(|k| k.questions.iter().map(QuestionTemplate::to_question))
        .collect();
    sort_by_dependencies(questions)
}

/// Repeatedly place every question whose dependencies are already placed.
/// Cycles and dangling dependencies are appended in their original order.
fn sort_by_dependencies(questions: Vec<RefinementQuestion>) -> Vec<RefinementQuestion> {
    let mut sorted: Vec<RefinementQuestion> = Vec::with_capacity(questions.len());
    let mut remaining = questions;

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|q| {
            q.depends_on
                .iter()
                .all(|dep| sorted.iter().any(|placed| &placed.id == dep))
        });
        if ready.is_empty() {
            debug!(count = blocked.len(), "sort_by_dependencies: unresolved dependencies, appending");
            sorted.extend(blocked);
            break;
        }
        sorted.extend(ready);
        remaining = blocked;
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("python").map(|k| k.name), Some("Python"));
        assert!(lookup("COBOL").is_none());
    }

    #[test]
    fn test_combined_entry_requires_exact_selection() {
        assert_eq!(combined_for(&set(&["TypeScript", "React"])).map(|k| k.name), Some("React+TypeScript"));
        assert!(combined_for(&set(&["React", "TypeScript", "Docker"])).is_none());
        assert!(combined_for(&set(&["React"])).is_none());
    }

    #[test]
    fn test_best_practices_dedup_in_order() {
        let practices = best_practices(&set(&["Node.js", "React"]));
        // Individual entries first, in sorted stack order
        assert_eq!(practices[0], "Use async/await over callbacks");
        assert!(practices.contains(&"API versioning"));
        let unique: BTreeSet<_> = practices.iter().collect();
        assert_eq!(unique.len(), practices.len());
    }

    #[test]
    fn test_common_issues_dedup() {
        let issues = common_issues(&set(&["Node.js", "Python"]));
        assert_eq!(issues.iter().filter(|i| **i == "Performance optimization").count(), 1);
    }

    #[test]
    fn test_unknown_stacks_contribute_nothing() {
        assert!(best_practices(&set(&["Haskell"])).is_empty());
        assert!(contextual_questions(&set(&["Haskell"])).is_empty());
    }

    #[test]
    fn test_contextual_questions_respect_dependencies() {
        let questions = contextual_questions(&set(&["React", "TypeScript"]));
        let position = |id: &str| questions.iter().position(|q| q.id == id).unwrap();

        assert_eq!(questions[0].id, "react-typescript-setup");
        assert!(position("react-version") < position("react-architecture"));
        assert!(position("react-architecture") < position("react-state"));
        assert!(position("typescript-experience") < position("typescript-features"));
    }

    #[test]
    fn test_sort_appends_cycles() {
        let a = RefinementQuestion::new("a", QuestionKind::Clarification, "A?", vec![]).depends_on(["b"]);
        let b = RefinementQuestion::new("b", QuestionKind::Clarification, "B?", vec![]).depends_on(["a"]);
        let c = RefinementQuestion::new("c", QuestionKind::Clarification, "C?", vec![]);
        let sorted = sort_by_dependencies(vec![a, b, c]);
        let ids: Vec<_> = sorted.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_templates_have_valid_answer_counts() {
        for entry in KNOWN_STACKS.iter().chain(COMBINED_STACKS) {
            for template in entry.questions {
                let q = template.to_question();
                assert!((2..=MAX_ANSWERS).contains(&q.answers.len()), "{}", q.id);
            }
        }
    }
}
