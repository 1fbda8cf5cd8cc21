//! The command set operating on the vehicle store.
//!
//! Every handler returns a single result string; failures the client should
//! see (validation, permission, store errors) come back as `!`-prefixed
//! lines rather than errors, matching the wire convention. Handlers that
//! enforce ownership read the injected identity from the trailing argument
//! position, where the auth gate put it.

use std::path::Path;
use std::sync::Arc;

use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::{CommandHandler, DispatchContext, Registry};
use crate::protocol::script::{self, SCRIPT_COMMAND};
use crate::store::{StoreError, UserId, VehicleStore};
use crate::vehicles::Vehicle;

/// Build the registry the server runs with: the full command set of the
/// inventory service, mutating commands flagged auth-required.
pub fn standard_registry(store: Arc<dyn VehicleStore>) -> Registry {
    let mut registry = Registry::new();

    registry.register("info", Arc::new(Info { store: store.clone() }), false);
    registry.register("show", Arc::new(Show { store: store.clone() }), false);
    registry.register("help", Arc::new(Help), false);
    registry.register(
        "print_ascending",
        Arc::new(PrintAscending { store: store.clone() }),
        false,
    );
    registry.register(
        "group_counting_by_coordinates",
        Arc::new(GroupCountingByCoordinates { store: store.clone() }),
        false,
    );
    registry.register("register", Arc::new(Register { store: store.clone() }), false);
    registry.register(SCRIPT_COMMAND, Arc::new(ExecuteScript), false);

    registry.register("insert", Arc::new(Insert { store: store.clone() }), true);
    registry.register("update", Arc::new(Update { store: store.clone() }), true);
    registry.register("remove_key", Arc::new(RemoveKey { store: store.clone() }), true);
    registry.register("clear", Arc::new(Clear { store: store.clone() }), true);
    registry.register(
        "remove_lower",
        Arc::new(RemoveLower { store: store.clone() }),
        true,
    );
    registry.register(
        "replace_if_greater",
        Arc::new(ReplaceIfGreater { store: store.clone() }),
        true,
    );
    registry.register(
        "remove_lower_key",
        Arc::new(RemoveLowerKey { store: store.clone() }),
        true,
    );
    registry.register(
        "remove_any_by_engine_power",
        Arc::new(RemoveAnyByEnginePower { store }),
        true,
    );

    registry
}

/// Split the injected identity off the end of an auth-gated argument list.
fn split_identity(args: &[String]) -> Option<(UserId, &[String])> {
    let (last, fields) = args.split_last()?;
    let uid = last.parse::<UserId>().ok()?;
    Some((uid, fields))
}

fn format_violations(violations: &[String]) -> String {
    format!("! Format error: {}", violations.join("; "))
}

fn store_failure(err: StoreError) -> String {
    format!("! Database error: {err}")
}

struct Info {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Info {
    fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        Ok(format!(
            "Init: {}\nType: {}\nLen: {}",
            self.store.init_date().to_rfc3339(),
            self.store.type_name(),
            self.store.len()?
        ))
    }
}

struct Show {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Show {
    fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let mut vehicles = self.store.sync_all()?;
        if vehicles.is_empty() {
            return Ok("Collection is empty".to_string());
        }
        vehicles.sort_by_key(|v| v.id);
        Ok(vehicles
            .iter()
            .map(Vehicle::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

struct Help;

impl CommandHandler for Help {
    fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        Ok("\
help: print this command reference
info: print collection information (type, init date, element count)
show: print every element of the collection
insert {element}: add a new element with the next free key
update id {element}: replace the element stored under the given id
remove_key id: remove the element stored under the given key
clear: empty the collection; clear users resets accounts
execute_script file_name: read and run a script from the given file
exit: quit the client
remove_lower {element}: remove your elements ordering below the given one
replace_if_greater id {element}: replace when the new element orders above the stored one
remove_lower_key id: remove your elements with a smaller key
remove_any_by_engine_power enginePower: remove one of your elements with that engine power
group_counting_by_coordinates: count elements grouped by coordinates
print_ascending: print elements in ascending engine-power order
register login password: create an account

Scripts:
lines starting with \";\" are comments and are skipped
lines starting with \": \" supply one answer for a later prompt"
            .to_string())
    }
}

struct Register {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Register {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        if args.len() < 2 {
            return Ok("! Not enough arguments".to_string());
        }
        match self.store.create_user(&args[0], &args[1]) {
            Ok(_) => Ok(format!("Successfully registered user {}", args[0])),
            Err(e) => Ok(store_failure(e)),
        }
    }
}

struct Insert {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Insert {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };

        let id = self.store.next_id()?;
        let vehicle = match Vehicle::from_args(fields, id, uid) {
            Ok(v) => v,
            Err(violations) => return Ok(format_violations(&violations)),
        };

        match self.store.insert(vehicle.clone()) {
            Ok(()) => Ok(format!("Inserted new {vehicle}")),
            Err(e) => Ok(store_failure(e)),
        }
    }
}

struct Update {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Update {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        let Some((raw_id, fields)) = fields.split_first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let Ok(id) = raw_id.parse::<i32>() else {
            return Ok("! id is not valid".to_string());
        };

        let Some(old) = self.store.get(id)? else {
            return Ok(format!("! Vehicle with key {id} not found"));
        };
        if old.user_id != uid {
            return Ok("! Permission error".to_string());
        }

        let update = match Vehicle::from_args(fields, id, uid) {
            Ok(v) => v,
            Err(violations) => return Ok(format_violations(&violations)),
        };

        match self.store.update(id, update.clone()) {
            Ok(()) => Ok(format!("Updated id {id}: {update}")),
            Err(e) => Ok(store_failure(e)),
        }
    }
}

struct RemoveKey {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for RemoveKey {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        let Some(raw_id) = fields.first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let Ok(id) = raw_id.parse::<i32>() else {
            return Ok("! id is not valid".to_string());
        };

        let Some(existing) = self.store.get(id)? else {
            return Ok(format!("! Vehicle with key {id} not found"));
        };
        if existing.user_id != uid {
            return Ok("! Permission error".to_string());
        }

        match self.store.remove_key(id) {
            Ok(removed) => Ok(format!("Removed {removed}")),
            Err(e) => Ok(store_failure(e)),
        }
    }
}

struct Clear {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for Clear {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        // Only the first registered account may clear.
        if uid != 1 {
            return Ok("! Permission error".to_string());
        }

        if fields.first().map(String::as_str) == Some("users") {
            match self.store.reset_users() {
                Ok(()) => Ok(
                    "Reset user accounts. Now create admin account using register.".to_string()
                ),
                Err(e) => Ok(store_failure(e)),
            }
        } else {
            match self.store.truncate().and_then(|()| self.store.reset_ids()) {
                Ok(()) => Ok("Cleared collection".to_string()),
                Err(e) => Ok(store_failure(e)),
            }
        }
    }
}

struct RemoveLower {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for RemoveLower {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };

        // Placeholder id: only the comparison fields matter for the example.
        let example = match Vehicle::from_args(fields, 1, uid) {
            Ok(v) => v,
            Err(violations) => return Ok(format_violations(&violations)),
        };

        let lower_ids: Vec<i32> = self
            .store
            .sync_all()?
            .into_iter()
            .filter(|v| v.user_id == uid)
            .filter(|v| v.cmp_by_power(&example).is_lt())
            .map(|v| v.id)
            .collect();

        let mut counter = 0;
        for id in lower_ids {
            match self.store.remove_key(id) {
                Ok(_) => counter += 1,
                Err(e) => return Ok(store_failure(e)),
            }
        }
        Ok(format!("Removed {counter} items"))
    }
}

struct ReplaceIfGreater {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for ReplaceIfGreater {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        let Some((raw_id, fields)) = fields.split_first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let Ok(id) = raw_id.parse::<i32>() else {
            return Ok("! Invalid id".to_string());
        };

        let Some(old) = self.store.get(id)? else {
            return Ok(format!("! Vehicle with key {id} not found"));
        };
        if old.user_id != uid {
            return Ok("! Permission error".to_string());
        }

        let replacement = match Vehicle::from_args(fields, id, uid) {
            Ok(v) => v,
            Err(violations) => return Ok(format_violations(&violations)),
        };

        if old.cmp_by_power(&replacement).is_lt() {
            match self.store.update(id, replacement) {
                Ok(()) => Ok("Replaced 1 item".to_string()),
                Err(e) => Ok(store_failure(e)),
            }
        } else {
            Ok("Replaced 0 items".to_string())
        }
    }
}

struct RemoveLowerKey {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for RemoveLowerKey {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        let Some(raw_id) = fields.first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let Ok(id) = raw_id.parse::<i32>() else {
            return Ok("! Invalid id".to_string());
        };

        let lower_ids: Vec<i32> = self
            .store
            .sync_all()?
            .into_iter()
            .filter(|v| v.user_id == uid)
            .filter(|v| v.id < id)
            .map(|v| v.id)
            .collect();

        let mut counter = 0;
        for victim in lower_ids {
            match self.store.remove_key(victim) {
                Ok(_) => counter += 1,
                Err(e) => return Ok(store_failure(e)),
            }
        }
        Ok(format!("Removed {counter} items"))
    }
}

struct RemoveAnyByEnginePower {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for RemoveAnyByEnginePower {
    fn run(&self, args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let Some((uid, fields)) = split_identity(args) else {
            return Ok("! Not enough arguments".to_string());
        };
        let Some(raw_power) = fields.first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let Ok(power) = raw_power.parse::<f32>() else {
            return Ok("! Invalid argument".to_string());
        };

        let victim = self
            .store
            .sync_all()?
            .into_iter()
            .filter(|v| v.user_id == uid)
            .find(|v| v.engine_power == power);

        match victim {
            None => Ok("Removed 0 items".to_string()),
            Some(v) => match self.store.remove_key(v.id) {
                Ok(_) => Ok("Removed 1 item".to_string()),
                Err(e) => Ok(store_failure(e)),
            },
        }
    }
}

struct PrintAscending {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for PrintAscending {
    fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        let mut vehicles = self.store.sync_all()?;
        vehicles.sort_by(|a, b| a.cmp_by_power(b));

        let mut out = String::new();
        for v in &vehicles {
            out.push_str(&format!("{} | {}\n", v.id, v));
        }
        out.push_str(&format!("\nTotal {} elements", vehicles.len()));
        Ok(out)
    }
}

struct GroupCountingByCoordinates {
    store: Arc<dyn VehicleStore>,
}

impl CommandHandler for GroupCountingByCoordinates {
    fn run(&self, _args: &[String], _ctx: &mut DispatchContext) -> Result<String> {
        use std::collections::HashMap;

        let mut groups: HashMap<crate::vehicles::Coordinates, usize> = HashMap::new();
        for v in self.store.sync_all()? {
            *groups.entry(v.coordinates).or_default() += 1;
        }

        let mut lines: Vec<String> = groups
            .into_iter()
            .map(|(coords, count)| format!("{coords}: {count}"))
            .collect();
        lines.sort();
        Ok(lines.join("\n"))
    }
}

struct ExecuteScript;

impl CommandHandler for ExecuteScript {
    fn run(&self, args: &[String], ctx: &mut DispatchContext) -> Result<String> {
        let Some(raw_path) = args.first() else {
            return Ok("! Not enough arguments".to_string());
        };
        let path = raw_path.trim_matches('"');

        match script::expand(Path::new(path), &mut ctx.guard) {
            Ok(expansion) => {
                let queued = expansion.instructions.len();
                for instruction in &expansion.instructions {
                    ctx.enqueue(instruction);
                }
                ctx.prompts.extend(expansion.prompts);
                Ok(format!("Running script {path}: {queued} instructions"))
            }
            Err(ProtocolError::Io(e)) => Ok(format!("! Cannot read script {path}: {e}")),
            Err(e) => Err(e),
        }
    }
}
