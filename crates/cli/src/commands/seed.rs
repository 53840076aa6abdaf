//! `campusdesk seed`: load the demo campus dataset.

use campusdesk_config::AppConfig;
use campusdesk_store::seed_demo;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let stores = super::open_stores(config).await?;
    if stores.backend() == "in_memory" {
        println!("Warning: the in-memory database is discarded when this command exits.");
    }

    let report = seed_demo(stores.campus.as_ref()).await?;
    println!("Seeded {}:", config.database.url);
    println!("   users:        {}", report.users);
    println!("   buildings:    {}", report.buildings);
    println!("   departments:  {}", report.departments);
    println!("   courses:      {}", report.courses);
    println!("   news:         {}", report.news);
    println!("   fee catalogs: {}", report.fee_catalogs);
    println!("   quizzes:      {}", report.quizzes);
    Ok(())
}
