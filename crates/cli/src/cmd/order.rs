use anyhow::{Context, Result};

use setup_sdl_lib::project::{Project, build_order};

use crate::output::{OutputFormat, print_json, symbols};

pub fn cmd_order(names: &[String], output: OutputFormat) -> Result<()> {
  let projects = names
    .iter()
    .map(|name| name.parse::<Project>())
    .collect::<Result<Vec<_>, _>>()?;

  let order = build_order(&projects).context("Failed to order projects")?;

  if output.is_json() {
    let names: Vec<_> = order.iter().map(Project::name).collect();
    return print_json(&names);
  }

  for (i, project) in order.iter().enumerate() {
    let deps = project
      .deps()
      .iter()
      .map(|group| group.iter().map(Project::name).collect::<Vec<_>>().join("|"))
      .collect::<Vec<_>>();
    if deps.is_empty() {
      println!("{}. {}", i + 1, project);
    } else {
      println!("{}. {} {} {}", i + 1, project, symbols::ARROW, deps.join(", "));
    }
  }
  Ok(())
}
