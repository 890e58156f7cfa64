//! Command line entry point for the Kinect recording tool.

fn main() -> anyhow::Result<()> {
    kinect_tool_lib::run()
}
