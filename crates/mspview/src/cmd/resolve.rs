use mspview_transport::{DeviceClass, DeviceDescriptor};

use crate::cmd::ResolveArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_descriptor, OutputFormat};

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let descriptor = DeviceDescriptor::parse(&args.device);
    if descriptor.class() == DeviceClass::None {
        return Err(CliError::new(
            USAGE,
            format!("unrecognized device address: {:?}", args.device),
        ));
    }
    print_descriptor(&args.device, &descriptor, format);
    Ok(SUCCESS)
}
