#![allow(dead_code)]

use std::sync::Once;

static TRACING: Once = Once::new();

/// Route library `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub mod petstore {
    use brrtschema::types::{Constraint, Field, StructDescriptor, TypeDescriptor};
    use serde_json::json;
    use std::sync::Arc;

    pub fn owner() -> Arc<StructDescriptor> {
        StructDescriptor::builder("petstore::models::Owner")
            .describe("Person responsible for a pet")
            .field("name", TypeDescriptor::string())
            .field("email", TypeDescriptor::string().optional())
            .build()
    }

    /// Self-referencing category tree.
    pub fn category() -> Arc<StructDescriptor> {
        StructDescriptor::builder("petstore::models::Category")
            .field("name", TypeDescriptor::string())
            .build_recursive(|b, category| {
                b.field("parent", category.clone().optional())
                    .field("children", TypeDescriptor::array(category).with_default(json!([])))
            })
    }

    pub fn pet(owner: &Arc<StructDescriptor>, category: &Arc<StructDescriptor>) -> Arc<StructDescriptor> {
        let status = TypeDescriptor::string()
            .constrained(Constraint::one_of([json!("available"), json!("pending"), json!("sold")]));
        StructDescriptor::builder("petstore::models::Pet")
            .field("id", TypeDescriptor::integer())
            .with_field(Field::new("name", TypeDescriptor::string()).describe("Display name"))
            .field("status", status.with_default(json!("available")))
            .field("owner", TypeDescriptor::from(owner))
            .field("category", TypeDescriptor::from(category).optional())
            .field("tags", TypeDescriptor::array(TypeDescriptor::string()).optional())
            .build()
    }
}
