//! Initialize a missive project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing missive...");

    let templates_dir = Path::new("templates");

    if templates_dir.exists() {
        if !yes {
            tracing::warn!("templates/ directory already exists. Use --yes to overwrite.");
            return Ok(());
        }
    } else {
        fs::create_dir_all(templates_dir).context("Failed to create templates directory")?;
    }

    let config_path = Path::new("missive.toml");
    if !config_path.exists() || yes {
        fs::write(config_path, DEFAULT_CONFIG).context("Failed to write missive.toml")?;
        tracing::info!("Created missive.toml");
    }

    let starter_path = templates_dir.join("announcement.html");
    if !starter_path.exists() || yes {
        fs::write(&starter_path, DEFAULT_TEMPLATE)
            .context("Failed to write templates/announcement.html")?;
        tracing::info!("Created templates/announcement.html");
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'missive preview' to browse your templates.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Missive Configuration

[templates]
# Directory of .html templates, loaded over the built-ins
dir = "templates"

[export]
# Output directory for 'missive export'
out = "previews"

# Uncomment to deliver over SMTP (local relay / Mailpit-style dev server).
# [smtp]
# host = "localhost"
# port = 1025
# from = "noreply@example.com"
# username = "user"
# password = "pass"
# auth = "plain"
"#;

const DEFAULT_TEMPLATE: &str = r#"---
subject: "News for {{userName|you}}"
description: Starter announcement template
sample:
  userName: Ada
  headline: We shipped something new
---
<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <title>Announcement</title>
  </head>
  <body>
    <h1>{{headline}}</h1>
    <p>Hi {{userName|there}},</p>
    <p>Edit this template in templates/announcement.html - the preview
    server reloads on save.</p>
  </body>
</html>
"#;
