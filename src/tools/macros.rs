//! Tool Definition Macros
//!
//! Simplifies tool creation by reducing boilerplate

/// Define tool metadata using a declarative syntax
///
/// # Example
/// ```
/// use pooch_palace::tool_metadata;
///
/// let metadata = tool_metadata! {
///     name: "scheduleDogAdoptionAppointment",
///     description: "schedule an appointment to adopt a dog",
///     parameters: [
///         {
///             name: "dogId",
///             type: "integer",
///             description: "the id of the dog",
///             required: true
///         }
///     ]
/// };
/// assert_eq!(metadata.parameters.len(), 1);
/// ```
#[macro_export]
macro_rules! tool_metadata {
    (
        name: $name:expr,
        description: $description:expr,
        parameters: [
            $(
                {
                    name: $param_name:expr,
                    type: $param_type:expr,
                    description: $param_desc:expr,
                    required: $param_required:expr
                }
            ),* $(,)?
        ]
    ) => {
        $crate::tools::ToolMetadata {
            name: $name.to_string(),
            description: $description.to_string(),
            parameters: vec![
                $(
                    $crate::tools::ToolParameter {
                        name: $param_name.to_string(),
                        param_type: $param_type.to_string(),
                        description: $param_desc.to_string(),
                        required: $param_required,
                    }
                ),*
            ],
        }
    };
}

/// Validate required string parameter
#[macro_export]
macro_rules! validate_required_string {
    ($args:expr, $param:expr) => {
        $args[$param].as_str().ok_or_else(|| {
            anyhow::anyhow!("'{}' parameter is required and must be a string", $param)
        })?
    };
}

/// Validate required integer parameter
#[macro_export]
macro_rules! validate_required_number {
    ($args:expr, $param:expr) => {
        $args[$param].as_i64().ok_or_else(|| {
            anyhow::anyhow!("'{}' parameter is required and must be an integer", $param)
        })?
    };
}
