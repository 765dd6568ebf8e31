//! Starter prompt library
//!
//! Quick-start templates (with `[PLACEHOLDER]` slots the user fills in) and
//! detailed examples that can be refined as they are. Either kind can seed a
//! refinement in place of a typed idea.

use std::collections::HashMap;

use regex::{Captures, Regex};
use tracing::debug;

/// `[NAME]` or `[NAME, hint text]`
const PLACEHOLDER_PATTERN: &str = r"\[([A-Z][A-Z0-9_]*)(?:,\s*([^\]]*))?\]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Template,
    Example,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Example => "example",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LibraryEntry {
    pub id: &'static str,
    pub kind: EntryKind,
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

const fn template(id: &'static str, icon: &'static str, title: &'static str, prompt: &'static str) -> LibraryEntry {
    LibraryEntry {
        id,
        kind: EntryKind::Template,
        icon,
        title,
        description: "",
        prompt,
    }
}

const fn example(id: &'static str, title: &'static str, description: &'static str, prompt: &'static str) -> LibraryEntry {
    LibraryEntry {
        id,
        kind: EntryKind::Example,
        icon: "",
        title,
        description,
        prompt,
    }
}

pub const TEMPLATES: &[LibraryEntry] = &[
    template("unit-tests", "\u{1F9EA}", "Write Unit Tests",
        "Write comprehensive unit tests for the following [LANGUAGE] code using the [TESTING_FRAMEWORK] framework. Ensure you cover all logical paths and edge cases, such as [SPECIFIC_CASE_1] and [SPECIFIC_CASE_2]. Mock any external dependencies like API calls or database interactions."),
    template("api-docs", "\u{1F4C4}", "Generate API Docs",
        "Generate API documentation in Markdown format for the following code snippet. Describe the endpoint, its purpose, the required parameters (including data types), the expected request body structure, and provide example success and error responses in JSON format."),
    template("readme", "\u{1F4D6}", "Create a README",
        "Create a professional README.md file for a project named \"[PROJECT_NAME]\". Include sections for: Project Overview, Features, Getting Started (Prerequisites, Installation), Usage, Tech Stack, and Contributing Guidelines."),
    template("refactor", "\u{1F527}", "Refactor Code",
        "Analyze the following code for potential improvements. Refactor it to improve readability, performance, and maintainability. Add comments to explain the changes and justify your refactoring decisions. The target language is [LANGUAGE]."),
    template("explain-concept", "\u{1F9E0}", "Explain a Concept",
        "Explain the concept of [CONCEPT] in simple terms, as if you were talking to a junior developer. Provide a clear definition, a real-world analogy, and a concise code example in [LANGUAGE] to illustrate its practical application."),
    template("commit-message", "\u{1F4AC}", "Write Git Commit Message",
        "Write a git commit message following the Conventional Commits specification. The change involves [TYPE_OF_CHANGE, e.g., feat, fix, chore] and a brief summary is \"[SUMMARY_OF_CHANGE]\". The body should provide more context about the problem and the solution."),
];

pub const EXAMPLES: &[LibraryEntry] = &[
    example("react-hook", "Generate a Custom React Hook",
        "Create a reusable hook for fetching data that handles loading, error, and data states.",
        "Create a custom React hook in TypeScript called `useFetch`. It should accept a URL as an argument and manage the data fetching lifecycle, including loading, error, and final data states. The hook should return an object with `{ data, isLoading, error }`. Use the Fetch API for the request."),
    example("python-traceback", "Debug a Python Traceback",
        "Analyze a Python error message to find the root cause and suggest a solution.",
        r#"I have a Python script that is failing. Analyze the following traceback, explain the likely cause of the "TypeError", and suggest a specific code change to fix the issue.

Traceback:
```
Traceback (most recent call last):
  File "main.py", line 15, in <module>
    result = calculate_sum(data)
  File "main.py", line 8, in calculate_sum
    total = total + item
TypeError: unsupported operand type(s) for +: 'int' and 'str'
```"#),
    example("sql-index", "Optimize a SQL Query",
        "Improve the performance of a slow SQL query by adding appropriate indexes.",
        r#"The following SQL query is running slowly on a large 'users' table in PostgreSQL. Analyze the query and the table structure, then suggest the most effective index to add to improve its performance. Explain why your suggested index would help.

Query:
```sql
SELECT * FROM users WHERE email LIKE '%@example.com' AND status = 'active';
```

Table Structure:
```sql
CREATE TABLE users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    status VARCHAR(50),
    created_at TIMESTAMP
);
```"#),
    example("node-dockerfile", "Write a Dockerfile for a Node.js App",
        "Create a multi-stage Dockerfile for a production-ready Node.js application.",
        "Write a multi-stage Dockerfile for a Node.js Express application. The first stage should build the application by installing dependencies (including devDependencies) and running a build script. The final stage should be a lean, production-ready image that only copies over the necessary build artifacts and production dependencies from the builder stage. Use an Alpine-based Node image for the final stage to minimize size."),
    example("ci-pipeline", "Configure a CI/CD Pipeline",
        "Generate a basic GitHub Actions workflow file for a typical CI process.",
        "Generate a YAML configuration file for a GitHub Actions workflow named \"CI Pipeline\". This workflow should trigger on every push to the 'main' branch. It needs to perform the following jobs:
1.  Check out the repository's code.
2.  Set up Node.js version 18.
3.  Install project dependencies using 'npm ci'.
4.  Run the linter using 'npm run lint'.
5.  Run unit tests using 'npm run test'."),
];

/// Templates first, then examples
pub fn entries() -> impl Iterator<Item = &'static LibraryEntry> {
    TEMPLATES.iter().chain(EXAMPLES)
}

/// Find an entry by id, ignoring case
pub fn lookup(id: &str) -> Option<&'static LibraryEntry> {
    let id = id.trim();
    entries().find(|e| e.id.eq_ignore_ascii_case(id))
}

/// One fill-in slot of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub hint: Option<String>,
}

/// Finds and fills `[PLACEHOLDER]` slots
pub struct Placeholders {
    pattern: Regex,
}

impl Placeholders {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(PLACEHOLDER_PATTERN)?,
        })
    }

    /// Distinct slots in order of first appearance
    pub fn find(&self, prompt: &str) -> Vec<Placeholder> {
        let mut found: Vec<Placeholder> = Vec::new();
        for caps in self.pattern.captures_iter(prompt) {
            let name = &caps[1];
            if found.iter().any(|p| p.name == name) {
                continue;
            }
            found.push(Placeholder {
                name: name.to_string(),
                hint: caps.get(2).map(|m| m.as_str().trim().to_string()).filter(|h| !h.is_empty()),
            });
        }
        debug!(count = found.len(), "Placeholders::find: called");
        found
    }

    /// Replace every slot that has a non-blank value; others stay as written
    pub fn fill(&self, prompt: &str, values: &HashMap<String, String>) -> String {
        self.pattern
            .replace_all(prompt, |caps: &Captures| match values.get(&caps[1]).map(|v| v.trim()) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}
