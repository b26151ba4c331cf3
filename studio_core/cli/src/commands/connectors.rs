use catalog::CatalogFilter;
use clap::Args;
use common::error::StudioError;
use common::types::Category;

#[derive(Debug, Args)]
pub struct ConnectorsArgs {
    /// Case-insensitive substring filter on the connector id
    #[arg(long, default_value = "")]
    pub search: String,

    /// Restrict to one category (sql | cloud)
    #[arg(long)]
    pub category: Option<String>,
}

pub fn handle_connectors(args: &ConnectorsArgs) -> Result<(), StudioError> {
    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(StudioError::startup_msg)?;

    let filter = CatalogFilter {
        search: args.search.clone(),
        category,
    };
    for kind in catalog::list(&filter) {
        println!("{:<12} {}", kind.id, kind.category);
    }
    Ok(())
}
