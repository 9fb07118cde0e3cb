//! Playwright browser automation
//!
//! A spec's steps are compiled into one Playwright script executed by a
//! single `node` invocation, so the page (and the counter it displays)
//! lives across all steps of a scenario. The script reports its outcome
//! as a JSON object on the last line of stdout.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::spec::{TestStep, WaitState};

/// Playwright browser handle
pub struct PlaywrightHandle {
    /// Base URL of the server
    base_url: String,

    /// Directory for screenshots
    screenshot_dir: PathBuf,

    /// Directory the generated scripts are written to. Must live inside the
    /// repository so `require('playwright')` resolves against the repo's
    /// node_modules.
    scripts_dir: PathBuf,

    /// Viewport dimensions
    viewport_width: u32,
    viewport_height: u32,

    /// Browser type
    browser: Browser,

    /// Whether to run the browser headless
    headless: bool,

    /// Upper bound on a single script run
    script_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// What a generated script printed as its final stdout line
#[derive(Debug, Clone, Deserialize)]
struct ScriptOutcome {
    success: bool,
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_installed()?;

        std::fs::create_dir_all(&config.screenshot_dir)?;
        std::fs::create_dir_all(&config.scripts_dir)?;

        Ok(Self {
            base_url: config.base_url,
            screenshot_dir: config.screenshot_dir,
            scripts_dir: config.scripts_dir,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            browser: config.browser,
            headless: config.headless,
            script_timeout: config.script_timeout,
        })
    }

    /// Check that node and Playwright are available
    pub fn check_installed() -> E2eResult<()> {
        check_tool("node", &["--version"], E2eError::NodeNotFound)?;
        check_tool("npx", &["playwright", "--version"], E2eError::PlaywrightNotFound)
    }

    /// Execute all steps of a spec in one browser session
    pub async fn run_steps(&self, spec_name: &str, steps: &[TestStep]) -> E2eResult<()> {
        let script = self.build_script(steps);

        let script_path = self.scripts_dir.join(format!("{}.js", spec_name));
        std::fs::create_dir_all(&self.scripts_dir)?;
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = tokio::time::timeout(
            self.script_timeout,
            TokioCommand::new("node").arg(&script_path).output(),
        )
        .await
        .map_err(|_| {
            E2eError::Timeout(format!(
                "script '{}' after {:?}",
                spec_name, self.script_timeout
            ))
        })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        outcome_to_result(spec_name, outcome_from_stdout(&stdout), &stdout, &stderr)
    }

    /// Human-readable label for a step, used in script comments and failure
    /// reports
    fn step_name(&self, step: &TestStep) -> String {
        match step {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::Click { selector, count, .. } if *count > 1 => {
                format!("click:{}x{}", selector, count)
            }
            TestStep::Click { selector, .. } => format!("click:{}", selector),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::Focus { selector } => format!("focus:{}", selector),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { selector, .. } => format!("assert:{}", selector),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Evaluate { .. } => "evaluate".to_string(),
            TestStep::Log { message } => format!("log:{}", &message[..message.len().min(30)]),
        }
    }

    /// Build the Playwright script for a set of steps
    pub fn build_script(&self, steps: &[TestStep]) -> String {
        let mut script = String::new();

        // Header: browser setup plus the polling helpers text assertions
        // compile to. Text is read trimmed, matching how a person reads the
        // display.
        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};

  const waitForText = async (selector, expected, timeout) => {{
    try {{
      await page.waitForFunction(
        ([sel, want]) => (document.querySelector(sel)?.textContent ?? '').trim() === want,
        [selector, expected],
        {{ timeout }}
      );
    }} catch (e) {{
      const actual = ((await page.textContent(selector)) ?? '').trim();
      throw new Error('text of ' + selector + ' is "' + actual + '", expected "' + expected + '"');
    }}
  }};

  const waitForMatch = async (selector, pattern, timeout) => {{
    try {{
      await page.waitForFunction(
        ([sel, pat]) => new RegExp(pat).test((document.querySelector(sel)?.textContent ?? '').trim()),
        [selector, pattern],
        {{ timeout }}
      );
    }} catch (e) {{
      const actual = ((await page.textContent(selector)) ?? '').trim();
      throw new Error('text of ' + selector + ' is "' + actual + '", expected match for ' + pattern);
    }}
  }};

  let step = 'start';

  try {{
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            base_url = js_str(&self.base_url),
        ));

        // Generate step code
        for (i, step) in steps.iter().enumerate() {
            let label = self.step_name(step);
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, label));
            script.push_str(&format!("    step = {};\n", js_str(&label)));
            script.push_str(&self.step_to_js(step));
            script.push('\n');
        }

        // Footer. The outcome goes to stdout as the last line; exitCode
        // instead of exit() so the finally block still closes the browser.
        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.log(JSON.stringify({ success: false, step: step, error: String((error && error.message) || error) }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep) -> String {
        match step {
            TestStep::Navigate { url, wait_for_selector } => {
                let mut js = format!("    await page.goto(baseUrl + {});", js_str(url));
                if let Some(sel) = wait_for_selector {
                    js.push_str(&format!(
                        "\n    await page.waitForSelector({});",
                        js_str(sel)
                    ));
                }
                js
            }
            TestStep::Click { selector, count, timeout_ms } => {
                let timeout = timeout_ms.unwrap_or(5000);
                let sel = js_str(selector);
                if *count == 1 {
                    format!("    await page.click({}, {{ timeout: {} }});", sel, timeout)
                } else {
                    format!(
                        "    for (let i = 0; i < {count}; i++) {{\n      await page.click({sel}, {{ timeout: {timeout} }});\n    }}"
                    )
                }
            }
            TestStep::Press { selector, key } => match selector {
                Some(sel) => format!(
                    "    await page.locator({}).press({});",
                    js_str(sel),
                    js_str(key)
                ),
                None => format!("    await page.keyboard.press({});", js_str(key)),
            },
            TestStep::Focus { selector } => {
                format!("    await page.focus({});", js_str(selector))
            }
            TestStep::Wait { selector, timeout_ms, state } => {
                format!(
                    "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                    js_str(selector),
                    wait_state_str(state),
                    timeout_ms
                )
            }
            TestStep::Sleep { ms } => {
                format!("    await page.waitForTimeout({});", ms)
            }
            TestStep::Assert { selector, visible, enabled, text, matches, timeout_ms } => {
                let sel = js_str(selector);
                let mut assertions = Vec::new();

                if let Some(vis) = visible {
                    let state = if *vis { "visible" } else { "hidden" };
                    assertions.push(format!(
                        "    await page.waitForSelector({sel}, {{ state: '{state}', timeout: {timeout_ms} }});"
                    ));
                }

                if let Some(want) = enabled {
                    if *want {
                        assertions.push(format!(
                            "    if (!(await page.isEnabled({sel}))) throw new Error('expected enabled: ' + {sel});"
                        ));
                    } else {
                        assertions.push(format!(
                            "    if (await page.isEnabled({sel})) throw new Error('expected disabled: ' + {sel});"
                        ));
                    }
                }

                if let Some(t) = text {
                    assertions.push(format!(
                        "    await waitForText({sel}, {}, {timeout_ms});",
                        js_str(t)
                    ));
                }

                if let Some(p) = matches {
                    assertions.push(format!(
                        "    await waitForMatch({sel}, {}, {timeout_ms});",
                        js_str(p)
                    ));
                }

                assertions.join("\n")
            }
            TestStep::Screenshot { name, selector, full_page } => {
                let path = self.screenshot_dir.join(format!("{}.png", name));
                let path_js = js_str(&path.to_string_lossy());
                match selector {
                    Some(sel) => format!(
                        "    await page.locator({}).screenshot({{ path: {} }});",
                        js_str(sel),
                        path_js
                    ),
                    None => format!(
                        "    await page.screenshot({{ path: {}, fullPage: {} }});",
                        path_js, full_page
                    ),
                }
            }
            TestStep::Evaluate { script, expected } => {
                // Block-scoped so several evaluate steps can share a spec.
                // The page function is async to allow awaiting in-page hooks.
                let mut js = String::from("    {\n");
                js.push_str(&format!(
                    "      const result = await page.evaluate(async () => {{\n{}\n      }});\n",
                    indent(script, 8)
                ));
                if let Some(expected) = expected {
                    let want = serde_json::to_string(expected)
                        .unwrap_or_else(|_| "null".to_string());
                    js.push_str(
                        "      const got = JSON.stringify(result === undefined ? null : result);\n",
                    );
                    js.push_str(&format!("      const want = JSON.stringify({});\n", want));
                    js.push_str(
                        "      if (got !== want) throw new Error('evaluate returned ' + got + ', expected ' + want);\n",
                    );
                }
                js.push_str("    }");
                js
            }
            TestStep::Log { message } => {
                // stderr, so the outcome line on stdout stays parseable
                format!("    console.error('[spec] ' + {});", js_str(message))
            }
        }
    }
}

fn wait_state_str(state: &WaitState) -> &'static str {
    match state {
        WaitState::Visible => "visible",
        WaitState::Hidden => "hidden",
        WaitState::Attached => "attached",
        WaitState::Detached => "detached",
    }
}

/// Escape a Rust string as a JS string literal
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Indent every line of a snippet by `spaces`
fn indent(snippet: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    snippet
        .lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_tool(bin: &str, args: &[&str], missing: E2eError) -> E2eResult<()> {
    let status = Command::new(bin)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(missing),
    }
}

/// Parse the outcome JSON from the last non-empty stdout line
fn outcome_from_stdout(stdout: &str) -> Option<ScriptOutcome> {
    stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str(line.trim()).ok())
}

fn outcome_to_result(
    spec_name: &str,
    outcome: Option<ScriptOutcome>,
    stdout: &str,
    stderr: &str,
) -> E2eResult<()> {
    match outcome {
        Some(outcome) if outcome.success => Ok(()),
        Some(outcome) => {
            let step = outcome.step.unwrap_or_else(|| "unknown".to_string());
            let reason = outcome.error.unwrap_or_else(|| "no error reported".to_string());
            if step.starts_with("assert") || step.starts_with("evaluate") {
                Err(E2eError::AssertionFailed(format!("{} ({})", reason, step)))
            } else {
                Err(E2eError::StepFailed { step, reason })
            }
        }
        None => Err(E2eError::Playwright(format!(
            "script '{}' produced no outcome\nstdout: {}\nstderr: {}",
            spec_name, stdout, stderr
        ))),
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    pub script_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        let root = crate::server::workspace_root();
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            screenshot_dir: root.join("test-results/screenshots"),
            scripts_dir: root.join("test-results/scripts"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            script_timeout: Duration::from_secs(120),
        }
    }
}
