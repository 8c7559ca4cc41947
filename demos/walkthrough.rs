use std::{alloc::Layout, env, io::Read, ptr};

use freelist_alloc::{BreakAllocator, Strategy, print_alloc};
use libc::sbrk;

/// Waits for ENTER when the demo runs with `--step`, so the program break can
/// be inspected with `pmap` or `gdb` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_usage(allocator: &BreakAllocator) {
  println!(
    "    data segment = {} bytes, free = {} bytes, free blocks = {:?}",
    allocator.data_segment_size(),
    allocator.data_segment_free_space_size(),
    allocator.free_blocks(),
  );
}

fn main() {
  let step = env::args().any(|arg| arg == "--step");
  let placement = match env::var("FREELIST_PLACEMENT") {
    Ok(name) => match name.parse::<Strategy>() {
      Ok(placement) => placement,
      Err(err) => {
        eprintln!("{err}");
        std::process::exit(2);
      }
    },
    Err(_) => Strategy::default(),
  };

  println!("placement: {placement}");
  let mut allocator = BreakAllocator::new(placement);
  print_program_break("start");
  pause(step);

  // 1) Three neighbours straight from the program break.
  let layouts = [
    Layout::new::<u64>(),
    Layout::array::<u8>(100).unwrap(),
    Layout::array::<u16>(16).unwrap(),
  ];
  let blocks: Vec<*mut u8> = layouts
    .iter()
    .map(|&layout| {
      let block = allocator.allocate(layout);
      print_alloc(layout, block);
      block
    })
    .collect();

  unsafe {
    (blocks[0] as *mut u64).write(0x1122334455667788);
    ptr::write_bytes(blocks[1], 0xAB, layouts[1].size());
  }
  print_usage(&allocator);
  pause(step);

  // 2) Releasing the middle block leaves a hole on the free list.
  unsafe { allocator.deallocate(blocks[1]) };
  println!("\n[2] Released the 100 byte block at {:?}", blocks[1]);
  print_usage(&allocator);
  pause(step);

  // 3) A smaller request is carved out of the hole; the rest stays free.
  let layout = Layout::array::<u8>(24).unwrap();
  let reused = allocator.allocate(layout);
  println!("\n[3] Allocate [u8; 24]");
  print_alloc(layout, reused);
  println!("    reused the hole? {}", reused == blocks[1]);
  print_usage(&allocator);
  pause(step);

  // 4) Releasing everything coalesces the arena back into one block.
  unsafe {
    allocator.deallocate(reused);
    allocator.deallocate(blocks[0]);
    allocator.deallocate(blocks[2]);
  }
  println!("\n[4] Released everything");
  print_usage(&allocator);
  print_program_break("end");
}
