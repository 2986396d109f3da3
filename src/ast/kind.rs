//! # Instruction kinds and the two interlock-relevant kind sets.
//!
//! Every cell of a sliced program carries an [`InstructionKind`] tag naming
//! the operation at that address. The scheduler consults two fixed sets when
//! deciding whether a process may step:
//!
//! - [`needs_firmware`](InstructionKind::needs_firmware): operations that
//!   require exclusive access to the physical firmware device (movement,
//!   pin I/O, calibration, sequence invocation).
//! - [`allowed_when_locked`](InstructionKind::allowed_when_locked):
//!   operations that remain legal while the system is emergency-locked
//!   (status reporting, configuration updates, the unlock itself).
//!
//! Unrecognized tags decode to [`InstructionKind::Unknown`], which belongs
//! to neither set: an unknown instruction never touches the firmware and
//! never runs under emergency lock.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tag identifying the operation at a program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Empty-program sentinel; also reported for out-of-range addresses.
    Nothing,
    If,
    Calibrate,
    ChangeOwnership,
    CheckUpdates,
    ConfigUpdate,
    DumpInfo,
    EmergencyLock,
    EmergencyUnlock,
    Execute,
    ExecuteScript,
    FactoryReset,
    FindHome,
    Home,
    Install,
    InstallFirstPartyFarmware,
    MoveAbsolute,
    MoveRelative,
    PowerOff,
    ReadPin,
    ReadStatus,
    Reboot,
    RpcError,
    RpcOk,
    RpcRequest,
    SendMessage,
    Sequence,
    SetServoAngle,
    SetUserEnv,
    Sync,
    TogglePin,
    UninstallFarmware,
    UpdateFarmware,
    Wait,
    WritePin,
    Zero,
    /// Forward-compat catch-all for tags this build does not recognize.
    Unknown,
}

impl InstructionKind {
    /// The snake_case wire name of this kind.
    pub fn as_str(self) -> &'static str {
        use InstructionKind::*;
        match self {
            Nothing => "nothing",
            If => "_if",
            Calibrate => "calibrate",
            ChangeOwnership => "change_ownership",
            CheckUpdates => "check_updates",
            ConfigUpdate => "config_update",
            DumpInfo => "dump_info",
            EmergencyLock => "emergency_lock",
            EmergencyUnlock => "emergency_unlock",
            Execute => "execute",
            ExecuteScript => "execute_script",
            FactoryReset => "factory_reset",
            FindHome => "find_home",
            Home => "home",
            Install => "install",
            InstallFirstPartyFarmware => "install_first_party_farmware",
            MoveAbsolute => "move_absolute",
            MoveRelative => "move_relative",
            PowerOff => "power_off",
            ReadPin => "read_pin",
            ReadStatus => "read_status",
            Reboot => "reboot",
            RpcError => "rpc_error",
            RpcOk => "rpc_ok",
            RpcRequest => "rpc_request",
            SendMessage => "send_message",
            Sequence => "sequence",
            SetServoAngle => "set_servo_angle",
            SetUserEnv => "set_user_env",
            Sync => "sync",
            TogglePin => "toggle_pin",
            UninstallFarmware => "uninstall_farmware",
            UpdateFarmware => "update_farmware",
            Wait => "wait",
            WritePin => "write_pin",
            Zero => "zero",
            Unknown => "unknown",
        }
    }

    /// Maps a wire tag to its kind; anything unrecognized is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        use InstructionKind::*;
        match tag {
            "nothing" => Nothing,
            "_if" => If,
            "calibrate" => Calibrate,
            "change_ownership" => ChangeOwnership,
            "check_updates" => CheckUpdates,
            "config_update" => ConfigUpdate,
            "dump_info" => DumpInfo,
            "emergency_lock" => EmergencyLock,
            "emergency_unlock" => EmergencyUnlock,
            "execute" => Execute,
            "execute_script" => ExecuteScript,
            "factory_reset" => FactoryReset,
            "find_home" => FindHome,
            "home" => Home,
            "install" => Install,
            "install_first_party_farmware" => InstallFirstPartyFarmware,
            "move_absolute" => MoveAbsolute,
            "move_relative" => MoveRelative,
            "power_off" => PowerOff,
            "read_pin" => ReadPin,
            "read_status" => ReadStatus,
            "reboot" => Reboot,
            "rpc_error" => RpcError,
            "rpc_ok" => RpcOk,
            "rpc_request" => RpcRequest,
            "send_message" => SendMessage,
            "sequence" => Sequence,
            "set_servo_angle" => SetServoAngle,
            "set_user_env" => SetUserEnv,
            "sync" => Sync,
            "toggle_pin" => TogglePin,
            "uninstall_farmware" => UninstallFarmware,
            "update_farmware" => UpdateFarmware,
            "wait" => Wait,
            "write_pin" => WritePin,
            "zero" => Zero,
            _ => Unknown,
        }
    }

    /// True for operations requiring exclusive firmware access.
    pub fn needs_firmware(self) -> bool {
        use InstructionKind::*;
        matches!(
            self,
            ConfigUpdate
                | If
                | WritePin
                | ReadPin
                | MoveAbsolute
                | SetServoAngle
                | MoveRelative
                | Home
                | FindHome
                | TogglePin
                | Zero
                | Calibrate
                | Sequence
                | RpcRequest
        )
    }

    /// True for operations that may execute while emergency-locked.
    pub fn allowed_when_locked(self) -> bool {
        use InstructionKind::*;
        matches!(
            self,
            CheckUpdates
                | ConfigUpdate
                | UninstallFarmware
                | UpdateFarmware
                | RpcRequest
                | RpcOk
                | RpcError
                | Install
                | ReadStatus
                | Sync
                | PowerOff
                | Reboot
                | FactoryReset
                | SetUserEnv
                | InstallFirstPartyFarmware
                | ChangeOwnership
                | DumpInfo
                | If
                | SendMessage
                | Sequence
                | Wait
                | Execute
                | ExecuteScript
                | EmergencyLock
                | EmergencyUnlock
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InstructionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InstructionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(InstructionKind::from_tag(&tag))
    }
}
