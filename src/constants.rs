// -
// Environment

/// Flat environment overrides understood alongside `HARNESS__*` variables
pub(crate) const ENV_DOCKER_NETWORK_NAME: &str = "DOCKER_NETWORK_NAME";
pub(crate) const ENV_CONTROL_DB_CONTAINER: &str = "CONTROL_DB_CONTAINER";
pub(crate) const ENV_SPACETIME_CLI_BIN: &str = "SPACETIME_CLI_BIN";
pub(crate) const ENV_SPACETIME_BIN: &str = "SPACETIME_BIN";
pub(crate) const ENV_COMPOSE_FILE: &str = "COMPOSE_FILE";

/// Points the database CLI at a specific config file
pub(crate) const ENV_SPACETIME_CONFIG_FILE: &str = "SPACETIME_CONFIG_FILE";

pub(crate) const ENV_PREFIX: &str = "HARNESS";
pub(crate) const ENV_CONFIG_PATH: &str = "CONFIG_PATH";

// -
// Docker

/// `compose ps` template yielding `<id> <name>` per line
pub(crate) const PS_FORMAT: &str = "{{.ID}} {{.Name}}";

// -
// Control database

/// Reducer granting an identity admin rights over the control database
pub(crate) const CREATE_ADMIN_REDUCER: &str = "create_admin_account";
