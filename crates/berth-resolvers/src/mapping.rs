use crate::resolver::{Outcome, ResolutionContext, Resolver};
use crate::ResolverError;
use berth_schema::{
    ContainerDescription, ContainerType, ImageIdentifier, MappingEntry, Requirement, Resolution,
    ToolId,
};
use std::collections::HashMap;

/// Per-tool container overrides keyed by `(tool_id, container_type)`.
pub struct MappingResolver {
    name: String,
    table: HashMap<(ToolId, ContainerType), ImageIdentifier>,
}

impl MappingResolver {
    /// Keys are unique after configuration validation; a repeated key keeps
    /// its first identifier.
    pub fn new(name: String, mappings: &[MappingEntry]) -> Self {
        let mut table = HashMap::with_capacity(mappings.len());
        for m in mappings {
            table
                .entry((m.tool_id.clone(), m.container_type))
                .or_insert_with(|| m.identifier.clone());
        }
        Self { name, table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Resolver for MappingResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver_type(&self) -> &'static str {
        "mapping"
    }

    fn try_resolve(
        &self,
        requirement: &Requirement,
        ctx: &ResolutionContext,
    ) -> Result<Outcome, ResolverError> {
        let Some(container_type) = requirement.container_type.filter(|_| requirement.is_container())
        else {
            return Ok(Outcome::Inapplicable);
        };
        let key = (ctx.tool_id.clone(), container_type);
        Ok(match self.table.get(&key) {
            Some(identifier) => Outcome::Satisfied(Resolution::Container(
                ContainerDescription::new(identifier.clone(), container_type).resolved(),
            )),
            None => Outcome::Unsatisfied,
        })
    }
}
