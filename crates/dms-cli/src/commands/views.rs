//! View command handlers.

use serde::Serialize;
use tabled::Tabled;

use dms_core::{Dms, DmsElementId, DmsView, ViewConfiguration};

use crate::cli::{GlobalOpts, ViewsArgs, ViewsCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ViewSummary {
    id: i32,
    name: String,
    parent_id: Option<i32>,
    path: String,
    child_views: Vec<i32>,
    elements: Vec<DmsElementId>,
}

impl ViewSummary {
    fn from_view(view: &DmsView) -> Result<Self, CliError> {
        Ok(Self {
            id: view.id(),
            name: view.name()?.to_owned(),
            parent_id: view.parent_id()?,
            path: view.path()?.to_owned(),
            child_views: view.child_view_ids()?.to_vec(),
            elements: view.element_ids()?.to_vec(),
        })
    }
}

#[derive(Tabled)]
struct ViewRow {
    #[tabled(rename = "ID")]
    id: i32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Elements")]
    elements: usize,
}

impl From<&ViewSummary> for ViewRow {
    fn from(v: &ViewSummary) -> Self {
        Self {
            id: v.id,
            name: v.name.clone(),
            parent: v.parent_id.map_or_else(|| "-".into(), |p| p.to_string()),
            elements: v.elements.len(),
        }
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(v: &ViewSummary) -> String {
    output::detail_lines(&[
        ("ID", v.id.to_string()),
        ("Name", v.name.clone()),
        ("Path", v.path.clone()),
        (
            "Parent",
            v.parent_id.map_or_else(|| "-".into(), |p| p.to_string()),
        ),
        ("Child views", join(&v.child_views)),
        ("Elements", join(&v.elements)),
    ])
}

pub async fn handle(dms: &Dms, args: ViewsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ViewsCommand::List => {
            let views = dms
                .views()
                .await?
                .iter()
                .map(ViewSummary::from_view)
                .collect::<Result<Vec<_>, _>>()?;
            let out = output::render_list(&global.output, &views, |v| ViewRow::from(v), |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ViewsCommand::Show { id } => {
            let mut view = dms.view(id);
            view.load().await?;
            let summary = ViewSummary::from_view(&view)?;
            let out =
                output::render_single(&global.output, &summary, detail, |v| v.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ViewsCommand::Create { name, parent } => {
            let config = ViewConfiguration::new(&name)?.with_parent(parent)?;
            let view = dms.create_view(&config).await?;
            output::print_output(&view.id().to_string(), global.quiet);
            Ok(())
        }

        ViewsCommand::Rename { id, name } => {
            let mut view = dms.view(id);
            view.load().await?;
            view.set_name(&name)?;
            view.update().await?;
            if !global.quiet {
                eprintln!("Renamed view {id} to '{name}'");
            }
            Ok(())
        }

        ViewsCommand::Delete { id } => {
            util::confirm(&format!("delete view {id}"), global.yes)?;
            dms.view(id).delete().await?;
            if !global.quiet {
                eprintln!("Deleted view {id}");
            }
            Ok(())
        }
    }
}
